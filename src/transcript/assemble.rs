//! Segment list → single speaker-tagged transcript string.

use crate::stt::Segment;

/// Speaker-change marker placed before a segment's text.
pub fn speaker_marker(speaker: &str) -> String {
    format!("[{speaker}]:")
}

/// Concatenate segment texts in order, separated by single spaces.
///
/// When a segment carries a speaker that differs from the speaker of the
/// previous non-empty segment, a [`speaker_marker`] is inserted before its
/// text.  Segments whose text is blank contribute nothing and do not change
/// the current speaker.
///
/// ```rust
/// use session_transcriber::stt::Segment;
/// use session_transcriber::transcript::assemble;
///
/// let segments = vec![
///     Segment::new(0, 900, "How are you?").with_speaker("SPEAKER_00"),
///     Segment::new(900, 1_500, "Fine.").with_speaker("SPEAKER_01"),
/// ];
/// assert_eq!(
///     assemble(&segments),
///     "[SPEAKER_00]: How are you? [SPEAKER_01]: Fine."
/// );
/// ```
pub fn assemble(segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut current: Option<&str> = None;

    for seg in segments {
        let text = seg.text.trim();
        if text.is_empty() {
            continue;
        }

        if let Some(speaker) = seg.speaker.as_deref() {
            if current != Some(speaker) {
                push_word(&mut out, &speaker_marker(speaker));
                current = Some(speaker);
            }
        }
        push_word(&mut out, text);
    }

    out
}

fn push_word(out: &mut String, word: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(word);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_is_empty_string() {
        assert_eq!(assemble(&[]), "");
    }

    #[test]
    fn unlabelled_segments_are_joined() {
        let segs = vec![Segment::new(0, 1, " hello "), Segment::new(1, 2, "world")];
        assert_eq!(assemble(&segs), "hello world");
    }

    #[test]
    fn marker_only_on_speaker_change() {
        let segs = vec![
            Segment::new(0, 1, "a").with_speaker("S0"),
            Segment::new(1, 2, "b").with_speaker("S0"),
            Segment::new(2, 3, "c").with_speaker("S1"),
            Segment::new(3, 4, "d").with_speaker("S0"),
        ];
        assert_eq!(assemble(&segs), "[S0]: a b [S1]: c [S0]: d");
    }

    #[test]
    fn empty_text_segments_are_skipped() {
        let segs = vec![
            Segment::new(0, 1, "a").with_speaker("S0"),
            Segment::new(1, 2, "  ").with_speaker("S1"),
            Segment::new(2, 3, "b").with_speaker("S0"),
        ];
        assert_eq!(assemble(&segs), "[S0]: a b");
    }

    #[test]
    fn unlabelled_segment_keeps_current_speaker() {
        let segs = vec![
            Segment::new(0, 1, "a").with_speaker("S0"),
            Segment::new(1, 2, "b"),
            Segment::new(2, 3, "c").with_speaker("S0"),
        ];
        assert_eq!(assemble(&segs), "[S0]: a b c");
    }

    #[test]
    fn output_never_shrinks_as_segments_are_appended() {
        let all = vec![
            Segment::new(0, 1, "one").with_speaker("S0"),
            Segment::new(1, 2, ""),
            Segment::new(2, 3, "two").with_speaker("S1"),
            Segment::new(3, 4, "three"),
            Segment::new(4, 5, "   "),
            Segment::new(5, 6, "four").with_speaker("S0"),
        ];
        let mut last = 0;
        for n in 0..=all.len() {
            let len = assemble(&all[..n]).chars().count();
            assert!(len >= last, "prefix {n}: {len} < {last}");
            last = len;
        }
    }
}
