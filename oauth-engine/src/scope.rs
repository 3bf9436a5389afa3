//! Space-delimited scope strings (RFC 6749 Section 3.3)

use crate::error::GrantError;

/// Split a scope parameter into its tokens, dropping duplicates but keeping order.
/// An absent or blank parameter yields an empty list.
pub fn parse(raw: Option<&str>) -> Result<Vec<String>, GrantError> {
    let mut scopes: Vec<String> = Vec::new();
    for token in raw.unwrap_or_default().split_whitespace() {
        if !token.bytes().all(is_scope_char) {
            return Err(GrantError::InvalidScope(format!("malformed scope: {token}")));
        }
        if !scopes.iter().any(|s| s == token) {
            scopes.push(token.to_string());
        }
    }
    Ok(scopes)
}

pub fn join(scopes: &[String]) -> String {
    scopes.join(" ")
}

/// Whether every requested scope was part of the granted scope string
pub fn is_subset(requested: &[String], granted: &str) -> bool {
    let granted: Vec<&str> = granted.split_whitespace().collect();
    requested.iter().all(|s| granted.contains(&s.as_str()))
}

// NQCHAR = %x21 / %x23-5B / %x5D-7E
fn is_scope_char(b: u8) -> bool {
    b == 0x21 || (0x23..=0x5B).contains(&b) || (0x5D..=0x7E).contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            parse(Some("read  write read")).unwrap(),
            vec!["read".to_string(), "write".to_string()]
        );
        assert!(parse(None).unwrap().is_empty());
        assert!(parse(Some("   ")).unwrap().is_empty());
        assert_eq!(
            parse(Some("documents:read")).unwrap(),
            vec!["documents:read".to_string()]
        );
    }

    #[test]
    fn test_parse_rejects_bad_characters() {
        assert!(matches!(
            parse(Some("read \"write\"")),
            Err(GrantError::InvalidScope(_))
        ));
        assert!(matches!(
            parse(Some("back\\slash")),
            Err(GrantError::InvalidScope(_))
        ));
    }

    #[test]
    fn test_is_subset() {
        let requested = vec!["read".to_string()];
        assert!(is_subset(&requested, "read write"));
        assert!(!is_subset(&requested, "write"));
        assert!(is_subset(&[], ""));
    }
}
