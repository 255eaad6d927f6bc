//! Utilities.

/// Returns ceiling log2.
pub const fn clog2(value: usize) -> usize {
    if value == 0 {
        0
    } else {
        (::std::mem::size_of::<usize>() * 8) - (value - 1).leading_zeros() as usize
    }
}

/// Indents every nonempty line in the string.
pub fn indent(str: String, indent: usize) -> String {
    str.lines()
        .map(|l| if l.is_empty() { String::new() } else { format!("{}{}", " ".repeat(indent), l) })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a state code as an MSB-first bit string, as VHDL bit-string literals expect.
pub fn code_bits(code: u32, width: usize) -> String {
    (0..width).rev().map(|i| if code & (1 << i) != 0 { '1' } else { '0' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clog2_small_values() {
        assert_eq!(clog2(0), 0);
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(3), 2);
        assert_eq!(clog2(4), 2);
        assert_eq!(clog2(5), 3);
    }

    #[test]
    fn indent_leaves_empty_lines_blank() {
        assert_eq!(indent("a\n\nb".to_string(), 4), "    a\n\n    b");
    }

    #[test]
    fn code_bits_is_msb_first() {
        assert_eq!(code_bits(0b01, 2), "01");
        assert_eq!(code_bits(0b10, 2), "10");
        assert_eq!(code_bits(5, 4), "0101");
    }
}
