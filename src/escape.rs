//! RFC 4515 / RFC 4514 escaping for LDAP filters and DNs
//!
//! Values substituted into filter templates pass through here so a crafted
//! account name cannot change the shape of a query.

/// Escapes a string for safe use in an LDAP search filter (RFC 4515).
///
/// Escaped characters: `*` → `\2a`, `(` → `\28`, `)` → `\29`,
/// `\` → `\5c`, NUL → `\00`.
pub fn escape_ldap_filter(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes a string for safe use in an LDAP Distinguished Name (RFC 4514).
///
/// Escapes `, + " \ < > ;` anywhere, leading `#`, and leading or trailing
/// spaces.
pub fn escape_ldap_dn(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() * 2);

    for (i, &c) in chars.iter().enumerate() {
        let is_first = i == 0;
        let is_last = i == chars.len() - 1;

        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_first || is_last => {
                out.push_str("\\ ");
            }
            '#' if is_first => {
                out.push_str("\\#");
            }
            '\0' => {
                out.push_str("\\00");
            }
            _ => {
                out.push(c);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_filter_asterisk() {
        assert_eq!(escape_ldap_filter("admin*"), "admin\\2a");
        assert_eq!(escape_ldap_filter("*"), "\\2a");
    }

    #[test]
    fn test_escape_filter_parentheses() {
        assert_eq!(escape_ldap_filter("test(value)"), "test\\28value\\29");
    }

    #[test]
    fn test_escape_filter_backslash() {
        assert_eq!(escape_ldap_filter("path\\to\\file"), "path\\5cto\\5cfile");
    }

    #[test]
    fn test_escape_filter_injection_attempt() {
        let malicious = "*)(objectClass=*))(|(objectClass=*";
        assert_eq!(
            escape_ldap_filter(malicious),
            "\\2a\\29\\28objectClass=\\2a\\29\\29\\28|\\28objectClass=\\2a"
        );
    }

    #[test]
    fn test_escape_filter_safe_input() {
        assert_eq!(escape_ldap_filter("admin123"), "admin123");
        assert_eq!(escape_ldap_filter("user@example.com"), "user@example.com");
    }

    #[test]
    fn test_escape_dn_comma() {
        assert_eq!(escape_ldap_dn("Smith, John"), "Smith\\, John");
    }

    #[test]
    fn test_escape_dn_special_chars() {
        assert_eq!(escape_ldap_dn("test+value"), "test\\+value");
        assert_eq!(escape_ldap_dn("<value>"), "\\<value\\>");
    }

    #[test]
    fn test_escape_dn_spaces_and_hash() {
        assert_eq!(escape_ldap_dn(" leading"), "\\ leading");
        assert_eq!(escape_ldap_dn("trailing "), "trailing\\ ");
        assert_eq!(escape_ldap_dn("#value"), "\\#value");
        assert_eq!(escape_ldap_dn("test#value"), "test#value");
    }

    #[test]
    fn test_escape_dn_empty() {
        assert_eq!(escape_ldap_dn(""), "");
    }
}
