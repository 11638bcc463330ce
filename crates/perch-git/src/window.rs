//! Trims a streamed unified diff to the hunk containing a target line,
//! keeping at most `context_lines` rows either side of it. The hunk header
//! is recalculated for the cut, and the input iterator is dropped as soon
//! as the answer is known, which closes the feeding pipe. Until the target
//! row shows up, only the last `context_lines` rows are buffered.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Context,
    Add,
    Remove,
}

#[derive(Debug)]
struct BodyLine {
    text: String,
    kind: LineKind,
    old_no: Option<u32>,
    new_no: Option<u32>,
}

pub fn cut_around_line<I>(
    lines: I,
    line: u32,
    old_side: bool,
    context_lines: u32,
) -> Option<String>
where
    I: Iterator<Item = String>,
{
    let mut in_target_hunk = false;
    let mut hunk: VecDeque<BodyLine> = VecDeque::new();
    let mut target_idx: usize = 0;
    let mut old_cursor: u32 = 0;
    let mut new_cursor: u32 = 0;
    let mut in_hunk = false;

    for raw in lines {
        if let Some((old_start, _, new_start, _)) = parse_hunk_header(&raw) {
            if in_target_hunk {
                break;
            }
            hunk.clear();
            old_cursor = old_start;
            new_cursor = new_start;
            in_hunk = true;
            continue;
        }
        if !in_hunk {
            continue;
        }
        let Some(body) = classify(&raw, &mut old_cursor, &mut new_cursor) else {
            continue;
        };
        let hit = if old_side {
            body.kind != LineKind::Add && body.old_no == Some(line)
        } else {
            body.kind != LineKind::Remove && body.new_no == Some(line)
        };
        hunk.push_back(body);
        if hit && !in_target_hunk {
            in_target_hunk = true;
            target_idx = hunk.len() - 1;
        } else if !in_target_hunk && hunk.len() > context_lines as usize {
            hunk.pop_front();
        }
        // Enough trailing context collected: stop reading, dropping the rest
        // of the stream.
        if in_target_hunk && hunk.len() - 1 - target_idx >= context_lines as usize {
            break;
        }
    }

    if !in_target_hunk {
        return None;
    }

    let context = context_lines as usize;
    let from = target_idx.saturating_sub(context);
    let to = (target_idx + context).min(hunk.len() - 1);
    let kept = &hunk.make_contiguous()[from..=to];

    let old_count = kept
        .iter()
        .filter(|l| l.kind != LineKind::Add)
        .count() as u32;
    let new_count = kept
        .iter()
        .filter(|l| l.kind != LineKind::Remove)
        .count() as u32;
    let old_start = kept.iter().find_map(|l| l.old_no).unwrap_or(0);
    let new_start = kept.iter().find_map(|l| l.new_no).unwrap_or(0);

    let mut out = format!("@@ -{old_start},{old_count} +{new_start},{new_count} @@\n");
    for body in kept {
        out.push_str(&body.text);
        out.push('\n');
    }
    Some(out)
}

fn classify(raw: &str, old_cursor: &mut u32, new_cursor: &mut u32) -> Option<BodyLine> {
    let kind = match raw.as_bytes().first() {
        Some(b'+') => LineKind::Add,
        Some(b'-') => LineKind::Remove,
        Some(b' ') => LineKind::Context,
        // "\ No newline at end of file" and anything else carry no numbering.
        _ => return None,
    };
    let (old_no, new_no) = match kind {
        LineKind::Context => {
            let pair = (Some(*old_cursor), Some(*new_cursor));
            *old_cursor += 1;
            *new_cursor += 1;
            pair
        }
        LineKind::Remove => {
            let no = Some(*old_cursor);
            *old_cursor += 1;
            (no, None)
        }
        LineKind::Add => {
            let no = Some(*new_cursor);
            *new_cursor += 1;
            (None, no)
        }
    };
    Some(BodyLine {
        text: raw.to_string(),
        kind,
        old_no,
        new_no,
    })
}

pub(crate) fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let trimmed = line.strip_prefix("@@ ")?;
    let ranges = trimmed.split(" @@").next()?.trim();
    let mut parts = ranges.split_whitespace();
    let (old_start, old_lines) = parse_range(parts.next()?)?;
    let (new_start, new_lines) = parse_range(parts.next()?)?;
    Some((old_start, old_lines, new_start, new_lines))
}

fn parse_range(value: &str) -> Option<(u32, u32)> {
    let trimmed = value.trim_start_matches(['-', '+']);
    let mut parts = trimmed.split(',');
    let start = parts.next()?.parse::<u32>().ok()?;
    let lines = match parts.next() {
        Some(count) => count.parse::<u32>().ok()?,
        None => 1,
    };
    Some((start, lines))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff_lines(text: &str) -> impl Iterator<Item = String> + '_ {
        text.lines().map(str::to_string)
    }

    const DIFF: &str = "\
@@ -1,7 +1,8 @@
 one
 two
-three
+three prime
+three and a half
 four
 five
 six
 seven
";

    #[test]
    fn test_window_contains_target_and_respects_bound() {
        let patch = cut_around_line(diff_lines(DIFF), 3, false, 1).unwrap();
        let lines: Vec<&str> = patch.lines().collect();
        assert_eq!(lines[0], "@@ -3,1 +3,2 @@");
        assert_eq!(lines[1..], ["-three", "+three prime", "+three and a half"][..]);
        assert!(lines.len() <= 1 + 2 * 1 + 1);
    }

    #[test]
    fn test_old_side_addressing() {
        let patch = cut_around_line(diff_lines(DIFF), 3, true, 0).unwrap();
        assert_eq!(patch, "@@ -3,1 +0,0 @@\n-three\n");
    }

    #[test]
    fn test_header_recalculated_for_cut() {
        let patch = cut_around_line(diff_lines(DIFF), 4, false, 1).unwrap();
        let lines: Vec<&str> = patch.lines().collect();
        assert_eq!(lines[0], "@@ -4,1 +3,3 @@");
        assert_eq!(lines[1..], ["+three prime", "+three and a half", " four"][..]);
    }

    #[test]
    fn test_line_outside_diff_is_none() {
        assert!(cut_around_line(diff_lines(DIFF), 42, false, 2).is_none());
    }

    #[test]
    fn test_deep_target_keeps_leading_context() {
        let mut text = String::from("@@ -1,101 +1,101 @@\n");
        for n in 1..=99 {
            text.push_str(&format!(" row {n}\n"));
        }
        text.push_str("-row 100\n+row hundred\n row 101\n");

        let patch = cut_around_line(text.lines().map(str::to_string), 100, false, 2).unwrap();
        let lines: Vec<&str> = patch.lines().collect();
        assert_eq!(lines[0], "@@ -99,3 +99,3 @@");
        assert_eq!(
            lines[1..],
            [" row 99", "-row 100", "+row hundred", " row 101"][..]
        );
    }

    #[test]
    fn test_stops_reading_once_window_is_full() {
        let mut pulled = 0usize;
        let counted = DIFF.lines().map(|l| {
            pulled += 1;
            l.to_string()
        });
        let patch = cut_around_line(counted, 3, false, 1);
        assert!(patch.is_some());
        assert!(pulled < DIFF.lines().count());
    }
}
