use flowexpr_ast::{width_mask, Bits};
use flowexpr_errors::{Error, Result};
use flowexpr_span::Span;

/// A constant as written in source, before it is known which symbol (and
/// therefore which width) it is being compared against.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstLit {
    Str(String),
    /// `value`/`mask` with an optional intrinsic width (`Some` for IPv4,
    /// IPv6, and MAC literals, which carry their own width regardless of
    /// the symbol; `None` for plain decimal/hex literals, which adopt
    /// whatever width the compared symbol has).
    Number { value: u128, mask: Option<u128>, natural_width: Option<u16> },
}

impl ConstLit {
    /// Resolves this literal against a symbol of the given `width`,
    /// producing the `(value, mask)` pair a [`Comparison`](flowexpr_ast::Comparison)
    /// needs. Fails if an intrinsically-sized literal doesn't match the
    /// symbol's width, or if the value doesn't fit.
    pub fn to_bits(&self, width: u16, span: Span) -> Result<Bits> {
        let (value, mask, natural_width) = match self {
            ConstLit::Number { value, mask, natural_width } => (*value, *mask, *natural_width),
            ConstLit::Str(_) => {
                return Err(Error::type_level("expected a numeric constant, found a string literal", span));
            }
        };
        if let Some(nw) = natural_width {
            if nw != width {
                return Err(Error::type_level(
                    format!("literal has an intrinsic width of {nw} bits, but the symbol is {width} bits wide"),
                    span,
                ));
            }
        }
        if value > width_mask(width) {
            return Err(Error::operand(format!("constant {value:#x} does not fit in {width} bits"), span));
        }
        Ok(Bits::new(value, mask.unwrap_or_else(|| width_mask(width)), width))
    }

    pub fn to_str(&self, span: Span) -> Result<String> {
        match self {
            ConstLit::Str(s) => Ok(s.clone()),
            ConstLit::Number { .. } => Err(Error::type_level("expected a string literal, found a numeric constant", span)),
        }
    }
}

fn parse_radix(text: &str, radix: u32, span: Span) -> Result<u128> {
    u128::from_str_radix(text, radix).map_err(|_| Error::lexical(format!("malformed numeric literal `{text}`"), span))
}

pub fn decimal(text: &str, span: Span) -> Result<ConstLit> {
    Ok(ConstLit::Number { value: parse_radix(text, 10, span)?, mask: None, natural_width: None })
}

pub fn hex(text: &str, span: Span) -> Result<ConstLit> {
    Ok(ConstLit::Number { value: parse_radix(text, 16, span)?, mask: None, natural_width: None })
}

pub fn ipv4(text: &str, span: Span) -> Result<ConstLit> {
    let mut octets = [0u8; 4];
    let mut parts = text.split('.');
    for octet in octets.iter_mut() {
        let part = parts.next().ok_or_else(|| Error::lexical(format!("malformed IPv4 literal `{text}`"), span))?;
        *octet = part.parse::<u8>().map_err(|_| Error::lexical(format!("malformed IPv4 literal `{text}`"), span))?;
    }
    if parts.next().is_some() {
        return Err(Error::lexical(format!("malformed IPv4 literal `{text}`"), span));
    }
    let value = u32::from_be_bytes(octets) as u128;
    Ok(ConstLit::Number { value, mask: None, natural_width: Some(32) })
}

pub fn mac(text: &str, span: Span) -> Result<ConstLit> {
    let mut value: u128 = 0;
    let mut groups = 0;
    for part in text.split(':') {
        value = (value << 8) | parse_radix(part, 16, span)?;
        groups += 1;
    }
    if groups != 6 {
        return Err(Error::lexical(format!("malformed MAC literal `{text}`"), span));
    }
    Ok(ConstLit::Number { value, mask: None, natural_width: Some(48) })
}

pub fn ipv6(text: &str, span: Span) -> Result<ConstLit> {
    let value = expand_ipv6(text).ok_or_else(|| Error::lexical(format!("malformed IPv6 literal `{text}`"), span))?;
    Ok(ConstLit::Number { value, mask: None, natural_width: Some(128) })
}

/// Expands an IPv6 literal (with at most one `::` run) into its 128-bit
/// value, the way every IPv6 parser does: split on `::`, parse the
/// hextets on either side, and fill the gap with zero groups.
fn expand_ipv6(text: &str) -> Option<u128> {
    let parse_groups = |s: &str| -> Option<Vec<u16>> {
        if s.is_empty() {
            return Some(Vec::new());
        }
        s.split(':').map(|g| u16::from_str_radix(g, 16).ok()).collect()
    };

    let mut groups = if let Some((head, tail)) = text.split_once("::") {
        let head = parse_groups(head)?;
        let tail = parse_groups(tail)?;
        if head.len() + tail.len() > 8 {
            return None;
        }
        let mut full = head;
        full.resize(8 - tail.len(), 0);
        full.extend(tail);
        full
    } else {
        parse_groups(text)?
    };
    if groups.len() != 8 {
        return None;
    }
    let mut value: u128 = 0;
    for g in groups.drain(..) {
        value = (value << 16) | g as u128;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowexpr_span::Span;

    #[test]
    fn ipv4_packs_into_32_bits() {
        let lit = ipv4("192.168.0.1", Span::dummy()).unwrap();
        match lit {
            ConstLit::Number { value, natural_width, .. } => {
                assert_eq!(value, 0xc0a80001);
                assert_eq!(natural_width, Some(32));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn mac_packs_into_48_bits() {
        let lit = mac("aa:bb:cc:dd:ee:ff", Span::dummy()).unwrap();
        match lit {
            ConstLit::Number { value, .. } => assert_eq!(value, 0xaabbccddeeff),
            _ => panic!(),
        }
    }

    #[test]
    fn ipv6_expands_double_colon() {
        let lit = ipv6("fe80::1", Span::dummy()).unwrap();
        match lit {
            ConstLit::Number { value, .. } => assert_eq!(value, 0xfe80_0000_0000_0000_0000_0000_0000_0001),
            _ => panic!(),
        }
    }

    #[test]
    fn to_bits_rejects_width_mismatch() {
        let lit = ipv4("1.2.3.4", Span::dummy()).unwrap();
        assert!(lit.to_bits(16, Span::dummy()).is_err());
    }

    #[test]
    fn to_bits_rejects_overflowing_value() {
        let lit = decimal("256", Span::dummy()).unwrap();
        assert!(lit.to_bits(8, Span::dummy()).is_err());
        let lit = decimal("255", Span::dummy()).unwrap();
        assert!(lit.to_bits(8, Span::dummy()).is_ok());
    }
}
