//! Self-relative security descriptor parsing (MS-DTYP)
//!
//! nTSecurityDescriptor arrives as a binary self-relative descriptor. The
//! portable rendering is a summary string with ownership, DACL statistics,
//! and the top high-risk ACEs; canonical SDDL needs a Windows API and is
//! deliberately not a dependency here.

use crate::errors::{AdError, Result};
use crate::identity::parse_object_sid;

/// ACE type constants (MS-DTYP 2.4.4.1)
pub(crate) mod ace_types {
    pub const ACCESS_ALLOWED: u8 = 0x00;
    pub const ACCESS_DENIED: u8 = 0x01;
    pub const ACCESS_ALLOWED_OBJECT: u8 = 0x05;
    pub const ACCESS_DENIED_OBJECT: u8 = 0x06;
}

/// Access mask bits that matter for privilege escalation analysis
/// (MS-DTYP 2.4.3, MS-ADTS 5.1.3.2)
pub(crate) mod access_mask {
    pub const GENERIC_ALL: u32 = 0x10000000;
    pub const GENERIC_WRITE: u32 = 0x40000000;
    pub const WRITE_DACL: u32 = 0x00040000;
    pub const WRITE_OWNER: u32 = 0x00080000;
    pub const DELETE: u32 = 0x00010000;
    pub const DS_CONTROL_ACCESS: u32 = 0x00000100;
    pub const DS_SELF: u32 = 0x00000008;
    pub const DS_WRITE_PROP: u32 = 0x00000020;

    pub const HIGH_RISK: u32 = GENERIC_ALL
        | GENERIC_WRITE
        | WRITE_DACL
        | WRITE_OWNER
        | DELETE
        | DS_CONTROL_ACCESS
        | DS_WRITE_PROP
        | DS_SELF;
}

/// Simplified summary of a single ACE: grant/deny, trustee, and the risky
/// rights present in its mask
#[derive(Debug, Clone)]
pub struct AceSummary {
    pub allow: bool,
    pub trustee: String,
    pub mask: u32,
    pub rights: Vec<&'static str>,
}

/// Simplified summary of a security descriptor
#[derive(Debug, Clone, Default)]
pub struct SdSummary {
    pub owner_sid: String,
    pub group_sid: String,
    pub ace_count: usize,
    pub high_risk: Vec<AceSummary>,
}

struct ParsedAcl {
    ace_count: usize,
    aces: Vec<AceSummary>,
}

/// Returns the friendly name for well-known Windows SIDs, or empty when
/// the SID is not in the list.
/// https://learn.microsoft.com/en-us/windows-server/identity/ad-ds/manage/understand-security-identifiers
fn well_known_sid_name(sid: &str) -> &'static str {
    match sid {
        "S-1-1-0" => "Everyone",
        "S-1-5-11" => "Authenticated Users",
        "S-1-5-32-544" => "Administrators",
        "S-1-5-32-545" => "Users",
        "S-1-5-32-548" => "Account Operators",
        "S-1-5-32-549" => "Server Operators",
        "S-1-5-32-550" => "Print Operators",
        "S-1-5-32-551" => "Backup Operators",
        _ => "",
    }
}

/// Formats a SID for display, prefixing the well-known name when there is one
fn format_trustee(sid: &str) -> String {
    if sid.is_empty() {
        return String::new();
    }
    let name = well_known_sid_name(sid);
    if name.is_empty() {
        sid.to_string()
    } else {
        format!("{} ({})", name, sid)
    }
}

/// Decodes the risky rights present in an access mask into their names
fn decode_risky_rights(mask: u32) -> Vec<&'static str> {
    let mut rights = Vec::new();
    if mask & access_mask::GENERIC_ALL != 0 {
        rights.push("GENERIC_ALL");
    }
    if mask & access_mask::GENERIC_WRITE != 0 {
        rights.push("GENERIC_WRITE");
    }
    if mask & access_mask::WRITE_DACL != 0 {
        rights.push("WRITE_DACL");
    }
    if mask & access_mask::WRITE_OWNER != 0 {
        rights.push("WRITE_OWNER");
    }
    if mask & access_mask::DELETE != 0 {
        rights.push("DELETE");
    }
    if mask & access_mask::DS_CONTROL_ACCESS != 0 {
        rights.push("CONTROL_ACCESS");
    }
    if mask & access_mask::DS_WRITE_PROP != 0 {
        rights.push("WRITE_PROP");
    }
    if mask & access_mask::DS_SELF != 0 {
        rights.push("SELF");
    }
    rights
}

fn is_high_risk_mask(mask: u32) -> bool {
    mask & access_mask::HIGH_RISK != 0
}

/// Parses a self-relative security descriptor (MS-DTYP 2.4.6).
///
/// Header layout:
/// ```text
/// Offset  Size  Field
/// 0       1     Revision
/// 1       1     Sbz1 (padding)
/// 2       2     Control flags
/// 4       4     Owner SID offset
/// 8       4     Group SID offset
/// 12      4     SACL offset
/// 16      4     DACL offset
/// ```
pub fn parse_security_descriptor(raw: &[u8]) -> Result<SdSummary> {
    let mut out = SdSummary::default();
    if raw.len() < 20 {
        return Err(AdError::DecodeFailed {
            attribute: "nTSecurityDescriptor".to_string(),
            message: "security descriptor too short".to_string(),
        });
    }

    let owner_off = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]) as usize;
    let group_off = u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]) as usize;
    let dacl_off = u32::from_le_bytes([raw[16], raw[17], raw[18], raw[19]]) as usize;

    if owner_off != 0 && owner_off < raw.len() {
        if let Ok(sid) = parse_object_sid(&raw[owner_off..]) {
            out.owner_sid = sid;
        }
    }
    if group_off != 0 && group_off < raw.len() {
        if let Ok(sid) = parse_object_sid(&raw[group_off..]) {
            out.group_sid = sid;
        }
    }

    // Zero offset means no DACL is present
    if dacl_off == 0 || dacl_off >= raw.len() {
        return Ok(out);
    }

    let acl = parse_acl(&raw[dacl_off..])?;
    out.ace_count = acl.ace_count;
    for ace in acl.aces {
        if is_high_risk_mask(ace.mask) {
            out.high_risk.push(ace);
        }
    }
    Ok(out)
}

/// Parses a binary ACL (MS-DTYP 2.4.5).
///
/// ```text
/// Offset  Size  Field
/// 0       1     Revision
/// 1       1     Sbz1 (padding)
/// 2       2     ACL size
/// 4       2     ACE count
/// 6       2     Sbz2 (padding)
/// 8       ...   ACE entries
/// ```
fn parse_acl(b: &[u8]) -> Result<ParsedAcl> {
    if b.len() < 8 {
        return Err(AdError::DecodeFailed {
            attribute: "nTSecurityDescriptor".to_string(),
            message: "acl too short".to_string(),
        });
    }

    let acl_size = u16::from_le_bytes([b[2], b[3]]) as usize;
    let ace_count = u16::from_le_bytes([b[4], b[5]]) as usize;
    if acl_size < 8 || acl_size > b.len() {
        return Err(AdError::DecodeFailed {
            attribute: "nTSecurityDescriptor".to_string(),
            message: "invalid acl size".to_string(),
        });
    }

    let mut out = ParsedAcl {
        ace_count,
        aces: Vec::new(),
    };

    let mut off = 8;
    for _ in 0..ace_count {
        if off + 4 > acl_size {
            break;
        }
        let ace_type = b[off];
        let ace_size = u16::from_le_bytes([b[off + 2], b[off + 3]]) as usize;
        if ace_size < 4 || off + ace_size > acl_size {
            break;
        }
        let ace_bytes = &b[off..off + ace_size];

        match ace_type {
            ace_types::ACCESS_ALLOWED | ace_types::ACCESS_DENIED => {
                if ace_size < 8 {
                    off += ace_size;
                    continue;
                }
                // type|flags|size|mask|sid
                let mask = u32::from_le_bytes([
                    ace_bytes[4],
                    ace_bytes[5],
                    ace_bytes[6],
                    ace_bytes[7],
                ]);
                let trustee = parse_object_sid(&ace_bytes[8..]).unwrap_or_default();
                out.aces.push(AceSummary {
                    allow: ace_type == ace_types::ACCESS_ALLOWED,
                    trustee,
                    mask,
                    rights: decode_risky_rights(mask),
                });
            }
            ace_types::ACCESS_ALLOWED_OBJECT | ace_types::ACCESS_DENIED_OBJECT => {
                if ace_size < 16 {
                    off += ace_size;
                    continue;
                }
                // type|flags|size|mask|object_flags|[guid]|[inherited guid]|sid
                let mask = u32::from_le_bytes([
                    ace_bytes[4],
                    ace_bytes[5],
                    ace_bytes[6],
                    ace_bytes[7],
                ]);
                let flags = u32::from_le_bytes([
                    ace_bytes[8],
                    ace_bytes[9],
                    ace_bytes[10],
                    ace_bytes[11],
                ]);
                let mut cursor = 12;
                if flags & 0x1 != 0 {
                    cursor += 16; // ACE_OBJECT_TYPE_PRESENT
                }
                if flags & 0x2 != 0 {
                    cursor += 16; // ACE_INHERITED_OBJECT_TYPE_PRESENT
                }
                if cursor >= ace_size {
                    off += ace_size;
                    continue;
                }
                let trustee = parse_object_sid(&ace_bytes[cursor..]).unwrap_or_default();
                out.aces.push(AceSummary {
                    allow: ace_type == ace_types::ACCESS_ALLOWED_OBJECT,
                    trustee,
                    mask,
                    rights: decode_risky_rights(mask),
                });
            }
            _ => {}
        }

        off += ace_size;
    }

    Ok(out)
}

/// Formats a security descriptor as a one-line summary:
/// `Owner=…; Group=…; DACL=N ACE; HighRisk=K` plus up to 3 high-risk ACEs.
pub fn format_sd_summary(raw: &[u8]) -> Result<String> {
    let s = parse_security_descriptor(raw)?;

    let owner = format_trustee(&s.owner_sid);
    let group = format_trustee(&s.group_sid);

    let high = s.high_risk.len();
    let mut top = Vec::new();
    for ace in s.high_risk.iter().take(3) {
        let kind = if ace.allow { "ALLOW" } else { "DENY" };
        let rights = if ace.rights.is_empty() {
            format!("0x{:08X}", ace.mask)
        } else {
            ace.rights.join("|")
        };
        top.push(format!("{} {} {}", kind, format_trustee(&ace.trustee), rights));
    }

    let mut out = format!(
        "Owner={}; Group={}; DACL={} ACE; HighRisk={}",
        owner, group, s.ace_count, high
    );
    if !top.is_empty() {
        out.push_str("; Top=");
        out.push_str(&top.join(" | "));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nt_sid(sub_auths: &[u32]) -> Vec<u8> {
        let mut out = vec![0x01, sub_auths.len() as u8, 0, 0, 0, 0, 0, 0x05];
        for sa in sub_auths {
            out.extend_from_slice(&sa.to_le_bytes());
        }
        out
    }

    fn plain_ace(ace_type: u8, mask: u32, sid: &[u8]) -> Vec<u8> {
        let size = (8 + sid.len()) as u16;
        let mut out = vec![ace_type, 0x00];
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&mask.to_le_bytes());
        out.extend_from_slice(sid);
        out
    }

    fn object_ace(ace_type: u8, mask: u32, object_flags: u32, sid: &[u8]) -> Vec<u8> {
        let mut guids = 0;
        if object_flags & 0x1 != 0 {
            guids += 1;
        }
        if object_flags & 0x2 != 0 {
            guids += 1;
        }
        let size = (12 + guids * 16 + sid.len()) as u16;
        let mut out = vec![ace_type, 0x00];
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&mask.to_le_bytes());
        out.extend_from_slice(&object_flags.to_le_bytes());
        for _ in 0..guids {
            out.extend_from_slice(&[0xab; 16]);
        }
        out.extend_from_slice(sid);
        out
    }

    /// Builds a self-relative descriptor with owner, group, and the given ACEs
    fn build_descriptor(aces: &[Vec<u8>]) -> Vec<u8> {
        let owner = nt_sid(&[18]);
        let group = nt_sid(&[32, 544]);

        let acl_body_len: usize = aces.iter().map(|a| a.len()).sum();
        let acl_size = (8 + acl_body_len) as u16;

        let owner_off = 20u32;
        let group_off = owner_off + owner.len() as u32;
        let dacl_off = group_off + group.len() as u32;

        let mut raw = Vec::new();
        raw.push(0x01); // revision
        raw.push(0x00); // sbz1
        raw.extend_from_slice(&0x8004u16.to_le_bytes()); // control: SE_DACL_PRESENT | SE_SELF_RELATIVE
        raw.extend_from_slice(&owner_off.to_le_bytes());
        raw.extend_from_slice(&group_off.to_le_bytes());
        raw.extend_from_slice(&0u32.to_le_bytes()); // no SACL
        raw.extend_from_slice(&dacl_off.to_le_bytes());
        raw.extend_from_slice(&owner);
        raw.extend_from_slice(&group);

        // ACL header
        raw.push(0x02); // revision
        raw.push(0x00);
        raw.extend_from_slice(&acl_size.to_le_bytes());
        raw.extend_from_slice(&(aces.len() as u16).to_le_bytes());
        raw.extend_from_slice(&0u16.to_le_bytes());
        for ace in aces {
            raw.extend_from_slice(ace);
        }
        raw
    }

    #[test]
    fn test_descriptor_owner_and_group() {
        let raw = build_descriptor(&[]);
        let sd = parse_security_descriptor(&raw).unwrap();
        assert_eq!(sd.owner_sid, "S-1-5-18");
        assert_eq!(sd.group_sid, "S-1-5-32-544");
        assert_eq!(sd.ace_count, 0);
        assert!(sd.high_risk.is_empty());
    }

    #[test]
    fn test_descriptor_high_risk_ace() {
        let trustee = nt_sid(&[21, 1, 2, 3, 1105]);
        let aces = vec![
            plain_ace(ace_types::ACCESS_ALLOWED, 0x00020094, &nt_sid(&[11])), // read-ish, not risky
            plain_ace(ace_types::ACCESS_ALLOWED, access_mask::GENERIC_ALL, &trustee),
        ];
        let raw = build_descriptor(&aces);
        let sd = parse_security_descriptor(&raw).unwrap();
        assert_eq!(sd.ace_count, 2);
        assert_eq!(sd.high_risk.len(), 1);
        assert_eq!(sd.high_risk[0].trustee, "S-1-5-21-1-2-3-1105");
        assert_eq!(sd.high_risk[0].rights, vec!["GENERIC_ALL"]);
        assert!(sd.high_risk[0].allow);
    }

    #[test]
    fn test_descriptor_object_ace_with_guids() {
        let trustee = nt_sid(&[21, 9, 9, 9, 512]);
        let aces = vec![object_ace(
            ace_types::ACCESS_ALLOWED_OBJECT,
            access_mask::DS_CONTROL_ACCESS,
            0x3, // both GUIDs present
            &trustee,
        )];
        let raw = build_descriptor(&aces);
        let sd = parse_security_descriptor(&raw).unwrap();
        assert_eq!(sd.high_risk.len(), 1);
        assert_eq!(sd.high_risk[0].trustee, "S-1-5-21-9-9-9-512");
        assert_eq!(sd.high_risk[0].rights, vec!["CONTROL_ACCESS"]);
    }

    #[test]
    fn test_descriptor_deny_ace() {
        let aces = vec![plain_ace(
            ace_types::ACCESS_DENIED,
            access_mask::WRITE_DACL | access_mask::WRITE_OWNER,
            &nt_sid(&[11]),
        )];
        let raw = build_descriptor(&aces);
        let sd = parse_security_descriptor(&raw).unwrap();
        assert!(!sd.high_risk[0].allow);
        assert_eq!(sd.high_risk[0].rights, vec!["WRITE_DACL", "WRITE_OWNER"]);
    }

    #[test]
    fn test_summary_format() {
        let trustee = nt_sid(&[21, 1, 2, 3, 1105]);
        let aces = vec![plain_ace(
            ace_types::ACCESS_ALLOWED,
            access_mask::GENERIC_ALL,
            &trustee,
        )];
        let raw = build_descriptor(&aces);
        let summary = format_sd_summary(&raw).unwrap();
        assert_eq!(
            summary,
            "Owner=S-1-5-18; Group=Administrators (S-1-5-32-544); DACL=1 ACE; HighRisk=1; \
             Top=ALLOW S-1-5-21-1-2-3-1105 GENERIC_ALL"
        );
    }

    #[test]
    fn test_summary_caps_top_at_three() {
        let mut aces = Vec::new();
        for i in 0..5u32 {
            aces.push(plain_ace(
                ace_types::ACCESS_ALLOWED,
                access_mask::GENERIC_WRITE,
                &nt_sid(&[21, i, i, i, 500 + i]),
            ));
        }
        let raw = build_descriptor(&aces);
        let summary = format_sd_summary(&raw).unwrap();
        assert!(summary.contains("HighRisk=5"));
        assert_eq!(summary.matches("ALLOW").count(), 3);
    }

    #[test]
    fn test_descriptor_too_short() {
        assert!(parse_security_descriptor(&[0u8; 19]).is_err());
        assert!(parse_security_descriptor(&[]).is_err());
    }

    #[test]
    fn test_well_known_sid_rendering() {
        assert_eq!(format_trustee("S-1-1-0"), "Everyone (S-1-1-0)");
        assert_eq!(format_trustee("S-1-5-21-1-2-3-4"), "S-1-5-21-1-2-3-4");
        assert_eq!(format_trustee(""), "");
    }
}
