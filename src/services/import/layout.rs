use std::ops::Range;

/// First header cell of the Thai labeled sheet format ("ลำดับ" = "order").
pub(crate) const LABELED_HEADER_MARKER: &str = "ลำดับ";

/// Row layout of an uploaded question sheet, classified from the header row:
/// a labeled first cell wins, then wide sheets are the TOEIC extended format,
/// everything else falls back to the 8-column default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layout {
    Default8,
    Labeled9,
    Labeled10,
    Extended11,
}

impl Layout {
    pub(crate) fn detect(header: &[String]) -> Layout {
        let labeled =
            header.first().map(|cell| cell.contains(LABELED_HEADER_MARKER)).unwrap_or(false);

        // a labeled sheet narrower than 9 columns cannot hold its answer
        // column; let it fall through to the width-based rules
        if labeled && header.len() >= 9 {
            if header.len() == 9 {
                Layout::Labeled9
            } else {
                Layout::Labeled10
            }
        } else if header.len() >= 10 {
            Layout::Extended11
        } else {
            Layout::Default8
        }
    }

    pub(crate) fn text_column(self) -> usize {
        match self {
            Layout::Extended11 => 3,
            _ => 1,
        }
    }

    pub(crate) fn answer_column(self) -> usize {
        match self {
            Layout::Default8 => 6,
            Layout::Labeled9 => 7,
            Layout::Labeled10 => 8,
            Layout::Extended11 => 9,
        }
    }

    pub(crate) fn explanation_column(self) -> usize {
        self.answer_column() + 1
    }

    /// Columns holding answer choices. The fixed-width layouts require all
    /// four cells; labeled layouts keep whichever of these cells are
    /// non-empty.
    pub(crate) fn choice_columns(self) -> Range<usize> {
        match self {
            Layout::Default8 => 2..6,
            Layout::Labeled9 => 2..7,
            Layout::Labeled10 => 2..8,
            Layout::Extended11 => 5..9,
        }
    }

    pub(crate) fn requires_all_choices(self) -> bool {
        matches!(self, Layout::Default8 | Layout::Extended11)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Layout::Default8 => "default8",
            Layout::Labeled9 => "labeled9",
            Layout::Labeled10 => "labeled10",
            Layout::Extended11 => "extended11",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    #[test]
    fn labeled_marker_wins_at_labeled_widths() {
        let nine = header(&["ลำดับ", "b", "c", "d", "e", "f", "g", "h", "i"]);
        assert_eq!(Layout::detect(&nine), Layout::Labeled9);

        let ten = header(&["ลำดับที่", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
        assert_eq!(Layout::detect(&ten), Layout::Labeled10);

        let eleven = header(&["ลำดับ", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"]);
        assert_eq!(Layout::detect(&eleven), Layout::Labeled10);
    }

    #[test]
    fn labeled_header_narrower_than_nine_columns_is_not_labeled() {
        let eight = header(&["ลำดับ", "q", "a", "b", "c", "d", "answer", "why"]);
        assert_eq!(Layout::detect(&eight), Layout::Default8);
    }

    #[test]
    fn wide_unlabeled_header_is_extended() {
        let ten = header(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
        assert_eq!(Layout::detect(&ten), Layout::Extended11);

        let eleven = header(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"]);
        assert_eq!(Layout::detect(&eleven), Layout::Extended11);
    }

    #[test]
    fn narrow_unlabeled_header_is_default() {
        let eight = header(&["no", "question", "a", "b", "c", "d", "answer", "why"]);
        assert_eq!(Layout::detect(&eight), Layout::Default8);
        assert_eq!(Layout::detect(&[]), Layout::Default8);
    }

    #[test]
    fn answer_column_positions() {
        assert_eq!(Layout::Default8.answer_column(), 6);
        assert_eq!(Layout::Labeled9.answer_column(), 7);
        assert_eq!(Layout::Labeled10.answer_column(), 8);
        assert_eq!(Layout::Extended11.answer_column(), 9);
    }
}
