/// Answer cells accept a letter ("A".."E") or a 1-based number ("1".."5").
/// Returns the zero-based choice index, or None when the cell does not parse
/// or points outside the choice list.
pub(crate) fn parse_answer(raw: &str, choice_count: usize) -> Option<usize> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let index = match trimmed.to_ascii_uppercase().as_str() {
        "A" => 0,
        "B" => 1,
        "C" => 2,
        "D" => 3,
        "E" => 4,
        other => {
            let number: usize = other.parse().ok()?;
            number.checked_sub(1)?
        }
    };

    (index < choice_count).then_some(index)
}

pub(crate) fn index_to_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_to_zero_based_indexes() {
        assert_eq!(parse_answer("A", 4), Some(0));
        assert_eq!(parse_answer("d", 4), Some(3));
        assert_eq!(parse_answer(" b ", 4), Some(1));
        assert_eq!(parse_answer("E", 5), Some(4));
    }

    #[test]
    fn one_based_numbers_map_to_zero_based_indexes() {
        assert_eq!(parse_answer("1", 4), Some(0));
        assert_eq!(parse_answer("4", 4), Some(3));
        assert_eq!(parse_answer("0", 4), None);
    }

    #[test]
    fn out_of_range_answers_are_rejected() {
        assert_eq!(parse_answer("E", 4), None);
        assert_eq!(parse_answer("5", 4), None);
        assert_eq!(parse_answer("C", 2), None);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_answer("", 4), None);
        assert_eq!(parse_answer("AB", 4), None);
        assert_eq!(parse_answer("x", 4), None);
        assert_eq!(parse_answer("-1", 4), None);
    }

    #[test]
    fn letters_round_trip() {
        assert_eq!(index_to_letter(0), 'A');
        assert_eq!(index_to_letter(4), 'E');
        assert_eq!(parse_answer(&index_to_letter(2).to_string(), 4), Some(2));
    }
}
