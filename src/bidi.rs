//! Visual → logical reordering of mixed Persian/Latin text.
//!
//! Text coming out of the converter keeps the legacy screen order between
//! scripts: a Latin part code stored before the Persian description means
//! the description is read first.  Words are grouped into [`ScriptToken`]s,
//! maximal runs of words sharing a direction, and the token order is
//! reversed.  Whitespace between tokens keeps its place in the sequence and
//! each token keeps its internal order, so single-script text is unchanged.

/// Arabic, Arabic Presentation Forms-A and -B.
pub fn is_rtl_char(c: char) -> bool {
    matches!(c as u32, 0x0600..=0x06FF | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScriptToken {
    start: usize,
    end:   usize,
    rtl:   bool,
}

fn words(text: &str) -> Vec<ScriptToken> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                out.push(word(text, s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(word(text, s, text.len()));
    }
    out
}

fn word(text: &str, start: usize, end: usize) -> ScriptToken {
    let rtl = text[start..end].chars().next().is_some_and(is_rtl_char);
    ScriptToken { start, end, rtl }
}

fn tokens(text: &str) -> Vec<ScriptToken> {
    let mut out: Vec<ScriptToken> = Vec::new();
    for w in words(text) {
        match out.last_mut() {
            Some(last) if last.rtl == w.rtl => last.end = w.end,
            _ => out.push(w),
        }
    }
    out
}

pub fn reorder_visual_to_logical(text: &str) -> String {
    let toks = tokens(text);
    if toks.len() < 2 {
        return text.to_owned();
    }

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..toks[0].start]);
    for (i, tok) in toks.iter().rev().enumerate() {
        out.push_str(&text[tok.start..tok.end]);
        if i + 1 < toks.len() {
            let sep = &toks[i];
            out.push_str(&text[sep.end..toks[i + 1].start]);
        }
    }
    out.push_str(&text[toks[toks.len() - 1].end..]);
    out
}
