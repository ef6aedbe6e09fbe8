//! Positioned errors and their terminal rendering.
//!
//! Every stage of the pipeline reports failures through [`FullFiaErr`]:
//! an error value paired with the places in the source it points at.
//! The error value itself only needs [`FiaErr`], which names the kind
//! of error (`erreur de syntaxe`, `erreur de type`, ...) and carries
//! the message through [`Display`].

use std::fmt::Display;
use std::ops::{Bound, RangeBounds, RangeInclusive};

/// A `(line, column)` position in source code, 0-indexed.
/// Messages render positions 1-indexed.
pub type Cursor = (usize, usize);

/// An inclusive range of source positions.
pub type CursorRange = RangeInclusive<Cursor>;

/// An error kind the interpreter can report.
pub trait FiaErr: Display + Sized {
    /// The name of the error kind (e.g. `erreur de syntaxe`).
    fn err_name(&self) -> &'static str;

    /// Attach a single position.
    fn at(self, p: Cursor) -> FullFiaErr<Self> {
        FullFiaErr { err: self, pos: vec![Span { start: p, end: Some(p) }] }
    }

    /// Attach a range of positions. An unbounded end means the error
    /// runs to the end of the input.
    fn at_range(self, range: impl RangeBounds<Cursor>) -> FullFiaErr<Self> {
        FullFiaErr { err: self, pos: vec![Span::of(range)] }
    }

    /// Attach no position at all.
    fn at_unknown(self) -> FullFiaErr<Self> {
        FullFiaErr { err: self, pos: vec![] }
    }
}

impl<E: FiaErr> From<E> for FullFiaErr<E> {
    fn from(err: E) -> Self {
        err.at_unknown()
    }
}

/// An error together with where in the source it happened.
#[derive(PartialEq, Eq, Debug)]
pub struct FullFiaErr<E: FiaErr> {
    pub(crate) err: E,
    pos: Vec<Span>
}

/// One stretch of source an error points at.
/// An absent `end` means the stretch runs to the end of the input.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
struct Span {
    start: Cursor,
    end: Option<Cursor>
}

impl Span {
    fn of(range: impl RangeBounds<Cursor>) -> Self {
        let start = match range.start_bound() {
            Bound::Included(&p) | Bound::Excluded(&p) => p,
            Bound::Unbounded => (0, 0),
        };
        let end = match range.end_bound() {
            Bound::Included(&p) | Bound::Excluded(&p) => Some(p),
            Bound::Unbounded => None,
        };

        Span { start, end }
    }

    /// The 1-indexed `line:col` label of this span.
    fn label(&self) -> String {
        let (sl, sc) = self.start;
        match self.end {
            Some(end) if end == self.start => format!("{}:{}", sl + 1, sc + 1),
            Some((el, ec)) => format!("{}:{}-{}:{}", sl + 1, sc + 1, el + 1, ec + 1),
            None => format!("{}:{}-..", sl + 1, sc + 1),
        }
    }

    /// The source lines this span touches, each followed by a marker
    /// line: `^` under a single character, `~` runs under a stretch.
    fn underline(&self, src: &str) -> Vec<String> {
        let line = |n: usize| -> String {
            src.lines().nth(n).unwrap_or_default().into()
        };

        let (sl, sc) = self.start;
        let (el, ec) = match self.end {
            Some(p) => p,
            None => last_position(src),
        };

        if (sl, sc) == (el, ec) {
            vec![line(sl), format!("{}^", " ".repeat(sc))]
        } else if sl == el {
            let run = "~".repeat(ec.saturating_sub(sc) + 1);
            vec![line(sl), format!("{}{run}", " ".repeat(sc))]
        } else {
            // the stretch opens on one line and closes on another
            let first = line(sl);
            let opening = format!(
                "{}^{}",
                " ".repeat(sc),
                "~".repeat(first.len().saturating_sub(sc + 1))
            );
            let closing = format!("{}^", "~".repeat(ec));

            vec![first, opening, line(el), closing]
        }
    }
}

/// The position of the last character in the source.
fn last_position(src: &str) -> Cursor {
    let mut rows = 0;
    let mut last = "";
    for l in src.lines() {
        rows += 1;
        last = l;
    }

    if rows == 0 {
        (0, 0)
    } else {
        (rows - 1, last.len().saturating_sub(1))
    }
}

impl<E: FiaErr> FullFiaErr<E> {
    /// The one-line form: `1:5 :: erreur de syntaxe: ...`.
    /// Without a position, just the name and the message.
    pub fn short_msg(&self) -> String {
        let labels: Vec<_> = self.pos.iter()
            .map(Span::label)
            .collect();

        if labels.is_empty() {
            format!("{}: {}", self.err.err_name(), self.err)
        } else {
            format!("{} :: {}: {}", labels.join(", "), self.err.err_name(), self.err)
        }
    }

    /// The full form: the short message, then every source line in
    /// question with its markers underneath.
    pub fn full_msg(&self, src: &str) -> String {
        let mut out = vec![self.short_msg(), String::new()];
        for span in &self.pos {
            out.extend(span.underline(src));
        }

        out.join("\n")
    }

    /// Convert the inner error, keeping the positions.
    pub fn map<F: FiaErr>(self, f: impl FnOnce(E) -> F) -> FullFiaErr<F> {
        FullFiaErr { err: f(self.err), pos: self.pos }
    }
}

impl<E: FiaErr + PartialEq> PartialEq<E> for FullFiaErr<E> {
    fn eq(&self, other: &E) -> bool {
        &self.err == other
    }
}

macro_rules! full_fia_cast_impl {
    ($t:ty, $u:ty) => {
        impl From<$crate::err::FullFiaErr<$t>> for $crate::err::FullFiaErr<$u> {
            fn from(err: $crate::err::FullFiaErr<$t>) -> Self {
                err.map(<$u>::from)
            }
        }
    }
}
pub(crate) use full_fia_cast_impl;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Oups;

    impl Display for Oups {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("quelque chose a cassé")
        }
    }
    impl FiaErr for Oups {
        fn err_name(&self) -> &'static str {
            "erreur de test"
        }
    }

    #[test]
    fn short_msg_forms() {
        assert_eq!(
            Oups.at((0, 4)).short_msg(),
            "1:5 :: erreur de test: quelque chose a cassé"
        );
        assert_eq!(
            Oups.at_range((0, 1)..=(1, 3)).short_msg(),
            "1:2-2:4 :: erreur de test: quelque chose a cassé"
        );
        assert_eq!(
            Oups.at_unknown().short_msg(),
            "erreur de test: quelque chose a cassé"
        );
    }

    #[test]
    fn full_msg_marks_a_point() {
        let msg = Oups.at((0, 9)).full_msg("soit a = $;");
        assert_eq!(msg, "\
1:10 :: erreur de test: quelque chose a cassé

soit a = $;
         ^");
    }

    #[test]
    fn full_msg_marks_a_range() {
        let msg = Oups.at_range((0, 5)..=(0, 6)).full_msg("soit ab = 1;");
        assert_eq!(msg, "\
1:6-1:7 :: erreur de test: quelque chose a cassé

soit ab = 1;
     ~~");
    }

    #[test]
    fn full_msg_spans_lines() {
        let msg = Oups.at_range((0, 9)..=(1, 1)).full_msg("soit a = (1 +\n2;");
        assert_eq!(msg, "\
1:10-2:2 :: erreur de test: quelque chose a cassé

soit a = (1 +
         ^~~~
2;
~^");
    }

    #[test]
    fn open_range_runs_to_the_end() {
        let e = Oups.at_range((0, 5)..);
        assert_eq!(e.short_msg(), "1:6-.. :: erreur de test: quelque chose a cassé");

        let msg = e.full_msg("soit \"ab");
        assert_eq!(msg, "\
1:6-.. :: erreur de test: quelque chose a cassé

soit \"ab
     ~~~");
    }
}
