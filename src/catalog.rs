//! The built-in query catalog
//!
//! Filters reference the extended matching rule OIDs
//! (`1.2.840.113556.1.4.803` bit-OR, `.804` bit-AND, `.1941` in-chain),
//! which must appear literally in the strings sent to the DC. Queries whose
//! filters carry a `{domain}` placeholder need parameter substitution
//! before use.

use std::collections::HashMap;

use crate::attributes::*;
use crate::queries::{Query, QueryCategory};
use crate::uac::*;

/// Standard object queries
pub(crate) fn register_basic(queries: &mut HashMap<&'static str, Query>) {
    queries.insert(
        "users",
        Query::new(
            format!("({}=user)", ATTR_OBJECT_CLASS),
            &[
                ATTR_OBJECT_CLASS,
                ATTR_SAM_ACCOUNT_NAME,
                ATTR_USER_PRINCIPAL_NAME,
                ATTR_USER_ACCOUNT_CONTROL,
                ATTR_OBJECT_SID,
                ATTR_SERVICE_PRINCIPAL_NAME,
                ATTR_ADMIN_COUNT,
                ATTR_WHEN_CREATED,
                ATTR_PWD_LAST_SET,
                ATTR_MSDS_ALLOWED_TO_DELEGATE_TO,
                ATTR_MSDS_ALLOWED_TO_ACT,
            ],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "computers",
        Query::new(
            format!("({}=computer)", ATTR_OBJECT_CLASS),
            &[
                ATTR_OBJECT_CLASS,
                ATTR_SAM_ACCOUNT_NAME,
                ATTR_NAME,
                ATTR_OPERATING_SYSTEM,
                ATTR_OPERATING_SYSTEM_VERSION,
                ATTR_DNS_HOST_NAME,
                ATTR_USER_ACCOUNT_CONTROL,
                ATTR_OBJECT_SID,
                ATTR_WHEN_CREATED,
                ATTR_MSDS_ALLOWED_TO_DELEGATE_TO,
                ATTR_MSDS_ALLOWED_TO_ACT,
            ],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "dc",
        Query::new(
            format!(
                "(&({}=computer)({}:{}:={}))",
                ATTR_OBJECT_CLASS,
                ATTR_USER_ACCOUNT_CONTROL,
                OID_MATCH_RULE_BIT_OR,
                UAC_DOMAIN_CONTROLLER
            ),
            &[
                ATTR_OBJECT_CLASS,
                ATTR_SAM_ACCOUNT_NAME,
                ATTR_NAME,
                ATTR_OPERATING_SYSTEM,
                ATTR_OPERATING_SYSTEM_VERSION,
                ATTR_DNS_HOST_NAME,
                ATTR_USER_ACCOUNT_CONTROL,
                ATTR_OBJECT_SID,
                ATTR_WHEN_CREATED,
                ATTR_MSDS_ALLOWED_TO_DELEGATE_TO,
                ATTR_MSDS_ALLOWED_TO_ACT,
            ],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "ou",
        Query::new(
            format!("({}=organizationalUnit)", ATTR_OBJECT_CLASS),
            &[ATTR_NAME, ATTR_DISTINGUISHED_NAME],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "spn",
        Query::new(
            format!("(&({}=*))", ATTR_SERVICE_PRINCIPAL_NAME),
            &["dn", ATTR_CN, ATTR_SERVICE_PRINCIPAL_NAME],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "adminSDHolder",
        Query::new(
            format!(
                "(&({}=person)({}=*)({}=1))",
                ATTR_OBJECT_CATEGORY, ATTR_SAM_ACCOUNT_NAME, ATTR_ADMIN_COUNT
            ),
            &[ATTR_CN, ATTR_SAM_ACCOUNT_NAME],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "group",
        Query::new(
            format!(
                "(&({}=group)({}=1))",
                ATTR_OBJECT_CATEGORY, ATTR_ADMIN_COUNT
            ),
            &[
                ATTR_OBJECT_CLASS,
                ATTR_SAM_ACCOUNT_NAME,
                ATTR_NAME,
                ATTR_MEMBER,
                ATTR_MEMBER_OF,
                ATTR_GROUP_TYPE,
                ATTR_OBJECT_SID,
                ATTR_WHEN_CREATED,
                ATTR_ADMIN_COUNT,
            ],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "disabled",
        Query::new(
            format!(
                "({}:{}:={})",
                ATTR_USER_ACCOUNT_CONTROL, OID_MATCH_RULE_BIT_OR, UAC_ACCOUNT_DISABLE
            ),
            &[
                "dn",
                ATTR_SAM_ACCOUNT_NAME,
                ATTR_USER_PRINCIPAL_NAME,
                ATTR_LAST_LOGON_TIMESTAMP,
            ],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "trustDomain",
        Query::new(
            format!("({}=trustedDomain)", ATTR_OBJECT_CLASS),
            &[
                ATTR_NAME,
                ATTR_TRUST_DIRECTION,
                ATTR_TRUST_TYPE,
                ATTR_TRUST_ATTRIBUTES,
                ATTR_FLAT_NAME,
                ATTR_DISTINGUISHED_NAME,
            ],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "trustattributes",
        Query::new(
            format!(
                "(&({}=trustedDomain)({}=*))",
                ATTR_OBJECT_CLASS, ATTR_TRUST_ATTRIBUTES
            ),
            &[
                ATTR_NAME,
                ATTR_TRUST_ATTRIBUTES,
                ATTR_TRUST_DIRECTION,
                ATTR_TRUST_TYPE,
            ],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "sidhistory",
        Query::new(
            format!("({}=*)", ATTR_SID_HISTORY),
            &["dn", ATTR_CN, ATTR_SAM_ACCOUNT_NAME, ATTR_SID_HISTORY],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "gpo",
        Query::new(
            format!("({}=groupPolicyContainer)", ATTR_OBJECT_CLASS),
            &[
                ATTR_NAME,
                ATTR_DISPLAY_NAME,
                ATTR_VERSION_NUMBER,
                ATTR_GPC_FILE_SYS_PATH,
                ATTR_WHEN_CHANGED,
            ],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "gpomachine",
        Query::new(
            format!(
                "(&({}=groupPolicyContainer)({}=*))",
                ATTR_OBJECT_CATEGORY, ATTR_GPC_MACHINE_EXTENSION_NAMES
            ),
            &[ATTR_NAME, ATTR_DISPLAY_NAME, ATTR_GPC_MACHINE_EXTENSION_NAMES],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "gpouser",
        Query::new(
            format!(
                "(&({}=groupPolicyContainer)({}=*))",
                ATTR_OBJECT_CATEGORY, ATTR_GPC_USER_EXTENSION_NAMES
            ),
            &[ATTR_NAME, ATTR_DISPLAY_NAME, ATTR_GPC_USER_EXTENSION_NAMES],
            QueryCategory::Basic,
        ),
    );

    queries.insert(
        "machineAccountQuota",
        Query::new(
            "(objectClass=domain)",
            &["ms-DS-MachineAccountQuota"],
            QueryCategory::Basic,
        ),
    );
}

/// Privilege and group membership queries
pub(crate) fn register_privileges(queries: &mut HashMap<&'static str, Query>) {
    queries.insert(
        "admin",
        Query::new(
            format!(
                "(&(|(&({}=person)({}=user))({}=group))({}=1))",
                ATTR_OBJECT_CATEGORY, ATTR_OBJECT_CLASS, ATTR_OBJECT_CATEGORY, ATTR_ADMIN_COUNT
            ),
            &["dn", ATTR_CN, ATTR_MEMBER],
            QueryCategory::Admin,
        ),
    );

    queries.insert(
        "enterprise",
        Query::new(
            format!("({}=Enterprise Admins)", ATTR_SAM_ACCOUNT_NAME),
            &["dn", ATTR_CN, ATTR_MEMBER],
            QueryCategory::Admin,
        ),
    );

    queries.insert(
        "domainadmins",
        Query::new(
            format!(
                "(&({}=group)({}=Domain Admins))",
                ATTR_OBJECT_CLASS, ATTR_SAM_ACCOUNT_NAME
            ),
            &[ATTR_MEMBER, ATTR_DISTINGUISHED_NAME, ATTR_GROUP_TYPE],
            QueryCategory::Admin,
        ),
    );

    queries.insert(
        "enterpriseadmins",
        Query::new(
            format!(
                "(&({}=group)({}=Enterprise Admins))",
                ATTR_OBJECT_CLASS, ATTR_SAM_ACCOUNT_NAME
            ),
            &[ATTR_MEMBER, ATTR_DISTINGUISHED_NAME, ATTR_GROUP_TYPE],
            QueryCategory::Admin,
        ),
    );

    queries.insert(
        "schemaadmins",
        Query::new(
            format!(
                "(&({}=group)({}=Schema Admins))",
                ATTR_OBJECT_CLASS, ATTR_SAM_ACCOUNT_NAME
            ),
            &[ATTR_MEMBER, ATTR_DISTINGUISHED_NAME, ATTR_GROUP_TYPE],
            QueryCategory::Admin,
        ),
    );

    queries.insert(
        "adminholders",
        Query::new(
            format!(
                "(&({}=person)({}=*)({}=1))",
                ATTR_OBJECT_CATEGORY, ATTR_SAM_ACCOUNT_NAME, ATTR_ADMIN_COUNT
            ),
            &[
                ATTR_SAM_ACCOUNT_NAME,
                ATTR_DISTINGUISHED_NAME,
                ATTR_MEMBER_OF,
                ATTR_ADMIN_COUNT,
            ],
            QueryCategory::Admin,
        ),
    );

    queries.insert(
        "highpriv",
        Query::new(
            format!(
                "(&({}=user)({}=1))",
                ATTR_OBJECT_CLASS, ATTR_ADMIN_COUNT
            ),
            &[
                ATTR_SAM_ACCOUNT_NAME,
                ATTR_USER_PRINCIPAL_NAME,
                ATTR_MEMBER_OF,
                ATTR_ADMIN_COUNT,
                ATTR_USER_ACCOUNT_CONTROL,
            ],
            QueryCategory::Admin,
        ),
    );

    queries.insert(
        "permissions",
        Query::new(
            format!(
                "(&({}=user)({}=*))",
                ATTR_OBJECT_CLASS, ATTR_SAM_ACCOUNT_NAME
            ),
            &[
                ATTR_SAM_ACCOUNT_NAME,
                ATTR_USER_PRINCIPAL_NAME,
                ATTR_MEMBER_OF,
                ATTR_ADMIN_COUNT,
                ATTR_USER_ACCOUNT_CONTROL,
            ],
            QueryCategory::Permissions,
        ),
    );

    queries.insert(
        "groupnested",
        Query::new(
            format!("(&({}=group)({}=*))", ATTR_OBJECT_CLASS, ATTR_MEMBER),
            &[ATTR_CN, ATTR_MEMBER, ATTR_DISTINGUISHED_NAME, ATTR_GROUP_TYPE],
            QueryCategory::Admin,
        ),
    );

    queries.insert(
        "sensitivegroups",
        Query::new(
            format!(
                "(&({cls}=group)(|({sam}=Domain Admins)({sam}=Enterprise Admins)({sam}=Schema Admins)({sam}=Administrators)({sam}=Domain Controllers)({sam}=Enterprise Key Admins)({sam}=Domain Key Admins)))",
                cls = ATTR_OBJECT_CLASS,
                sam = ATTR_SAM_ACCOUNT_NAME
            ),
            &[ATTR_SAM_ACCOUNT_NAME, ATTR_MEMBER, ATTR_DISTINGUISHED_NAME],
            QueryCategory::Admin,
        ),
    );

    queries.insert(
        "managedby",
        Query::new(
            format!("(&({}=*))", ATTR_MANAGED_BY),
            &[ATTR_CN, ATTR_DISTINGUISHED_NAME, ATTR_MANAGED_BY],
            QueryCategory::Admin,
        ),
    );

    queries.insert(
        "acl",
        Query::new(
            format!(
                "(&({}=*)({}=*))",
                ATTR_OBJECT_CLASS, ATTR_NT_SECURITY_DESCRIPTOR
            ),
            &[ATTR_CN, ATTR_DISTINGUISHED_NAME, ATTR_NT_SECURITY_DESCRIPTOR],
            QueryCategory::Permissions,
        ),
    );
}

/// Kerberos attack surface queries
pub(crate) fn register_kerberos(queries: &mut HashMap<&'static str, Query>) {
    queries.insert(
        "asreproast",
        Query::new(
            format!(
                "(&({uac}:{bit_or}:={preauth})(!({uac}:{bit_or}:={disabled}))(!({cat}=computer)))",
                uac = ATTR_USER_ACCOUNT_CONTROL,
                bit_or = OID_MATCH_RULE_BIT_OR,
                preauth = UAC_DONT_REQUIRE_PREAUTH,
                disabled = UAC_ACCOUNT_DISABLE,
                cat = ATTR_OBJECT_CATEGORY
            ),
            &["dn", ATTR_SAM_ACCOUNT_NAME],
            QueryCategory::Kerberos,
        ),
    );

    queries.insert(
        "kerberoasting",
        Query::new(
            format!(
                "(&(!({}:{}:={}))(samAccountType=805306368)({}=*)(!{}=krbtgt))",
                ATTR_USER_ACCOUNT_CONTROL,
                OID_MATCH_RULE_BIT_OR,
                UAC_ACCOUNT_DISABLE,
                ATTR_SERVICE_PRINCIPAL_NAME,
                ATTR_SAM_ACCOUNT_NAME
            ),
            &["dn", ATTR_SAM_ACCOUNT_NAME, ATTR_SERVICE_PRINCIPAL_NAME],
            QueryCategory::Kerberos,
        ),
    );
}

/// Kerberos delegation queries
pub(crate) fn register_delegation(queries: &mut HashMap<&'static str, Query>) {
    queries.insert(
        "delegate",
        Query::new(
            format!("({}=*)", ATTR_MSDS_ALLOWED_TO_DELEGATE_TO),
            &[
                "dn",
                ATTR_CN,
                ATTR_SAM_ACCOUNT_NAME,
                ATTR_MSDS_ALLOWED_TO_DELEGATE_TO,
            ],
            QueryCategory::Delegation,
        ),
    );

    queries.insert(
        "unconstraineddelegate",
        Query::new(
            format!(
                "({}:{}:={})",
                ATTR_USER_ACCOUNT_CONTROL, OID_MATCH_RULE_BIT_OR, UAC_TRUSTED_FOR_DELEGATION
            ),
            &[
                "dn",
                ATTR_CN,
                ATTR_SAM_ACCOUNT_NAME,
                ATTR_USER_ACCOUNT_CONTROL,
                ATTR_OBJECT_CLASS,
            ],
            QueryCategory::Delegation,
        ),
    );

    queries.insert(
        "constraineddelegate",
        Query::new(
            format!("({}=*)", ATTR_MSDS_ALLOWED_TO_DELEGATE_TO),
            &[
                "dn",
                ATTR_CN,
                ATTR_SAM_ACCOUNT_NAME,
                ATTR_MSDS_ALLOWED_TO_DELEGATE_TO,
                ATTR_OBJECT_CLASS,
            ],
            QueryCategory::Delegation,
        ),
    );

    queries.insert(
        "resourceconstraineddelegate",
        Query::new(
            format!("({}=*)", ATTR_MSDS_ALLOWED_TO_ACT),
            &[
                "dn",
                ATTR_CN,
                ATTR_SAM_ACCOUNT_NAME,
                ATTR_MSDS_ALLOWED_TO_ACT,
                ATTR_OBJECT_CLASS,
            ],
            QueryCategory::Delegation,
        ),
    );
}

/// AD Certificate Services template queries.
///
/// The ESC1/ESC2 filters are the published template-misconfiguration
/// signatures; the literal OID chains are load-bearing and must not be
/// reformatted.
pub(crate) fn register_certificates(queries: &mut HashMap<&'static str, Query>) {
    queries.insert(
        "caComputer",
        Query::new(
            format!("(&({}=pKIEnrollmentService))", ATTR_OBJECT_CATEGORY),
            &[ATTR_CN],
            QueryCategory::AdCs,
        ),
    );

    queries.insert(
        "esc1",
        Query::new(
            format!(
                "(&({}=pkicertificatetemplate)(!(mspki-enrollment-flag:{}:=2))(|(mspki-ra-signature=0)(!(mspki-ra-signature=*)))(|(pkiextendedkeyusage=1.3.6.1.4.1.311.20.2.2)(pkiextendedkeyusage=1.3.6.1.5.5.7.3.2)(pkiextendedkeyusage=1.3.6.1.5.2.3.4)(pkiextendedkeyusage=2.5.29.37.0)(!(pkiextendedkeyusage=*)))(mspki-certificate-name-flag:{}:=1)(!(cn=OfflineRouter))(!(cn=CA))(!(cn=SubCA)))",
                ATTR_OBJECT_CLASS, OID_MATCH_RULE_BIT_AND, OID_MATCH_RULE_BIT_AND
            ),
            &[ATTR_CN],
            QueryCategory::AdCs,
        ),
    );

    queries.insert(
        "esc2",
        Query::new(
            format!(
                "(&({}=pkicertificatetemplate)(!(mspki-enrollment-flag:{}:=2))(|(mspki-ra-signature=0)(!(mspki-ra-signature=*)))(|(pkiextendedkeyusage=2.5.29.37.0)(!(pkiextendedkeyusage=*)))(!(cn=CA))(!(cn=SubCA)))",
                ATTR_OBJECT_CLASS, OID_MATCH_RULE_BIT_AND
            ),
            &[ATTR_CN],
            QueryCategory::AdCs,
        ),
    );
}

/// Queries that need the `{domain}` parameter substituted before use
pub(crate) fn register_domain_specific(queries: &mut HashMap<&'static str, Query>) {
    queries.insert(
        "dcclonerights",
        Query::new(
            format!(
                "(&({}=user)(|({}:{}:={})({}:{}:=CN=Cloneable Domain Controllers,CN=Users,{{domain}})))",
                ATTR_OBJECT_CLASS,
                ATTR_USER_ACCOUNT_CONTROL,
                OID_MATCH_RULE_BIT_OR,
                UAC_ENCRYPTED_TEXT_PASSWORD_ALLOWED,
                ATTR_MEMBER_OF,
                OID_MATCH_RULE_IN_CHAIN
            ),
            &["dn", ATTR_CN, ATTR_SAM_ACCOUNT_NAME, ATTR_MEMBER_OF],
            QueryCategory::Permissions,
        ),
    );

    queries.insert(
        "dcsync",
        Query::new(
            format!(
                "(&({}=user)(|({}:{}:=CN=Domain Admins,CN=Users,{{domain}})({}:{}:=CN=Enterprise Admins,CN=Users,{{domain}})({}:{}:=CN=Administrators,CN=Builtin,{{domain}})))",
                ATTR_OBJECT_CLASS,
                ATTR_MEMBER_OF,
                OID_MATCH_RULE_IN_CHAIN,
                ATTR_MEMBER_OF,
                OID_MATCH_RULE_IN_CHAIN,
                ATTR_MEMBER_OF,
                OID_MATCH_RULE_IN_CHAIN
            ),
            &["dn", ATTR_CN, ATTR_SAM_ACCOUNT_NAME, ATTR_MEMBER_OF],
            QueryCategory::Permissions,
        ),
    );
}
