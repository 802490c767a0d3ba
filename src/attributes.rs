//! Active Directory attribute names, matching-rule OIDs, and defaults
//!
//! Attribute name constants map to the LDAP display names defined in the
//! Microsoft schema. Filters and decoders reference these instead of
//! repeating string literals.
//! Reference: https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-adts/

// Core object attributes
pub const ATTR_OBJECT_CLASS: &str = "objectClass";
pub const ATTR_OBJECT_GUID: &str = "objectGUID";
pub const ATTR_OBJECT_SID: &str = "objectSid";
pub const ATTR_OBJECT_CATEGORY: &str = "objectCategory";
pub const ATTR_DISTINGUISHED_NAME: &str = "distinguishedName";
pub const ATTR_CN: &str = "cn";
pub const ATTR_NAME: &str = "name";

// Account attributes
pub const ATTR_SAM_ACCOUNT_NAME: &str = "sAMAccountName";
pub const ATTR_USER_PRINCIPAL_NAME: &str = "userPrincipalName";
pub const ATTR_USER_ACCOUNT_CONTROL: &str = "userAccountControl";
pub const ATTR_ACCOUNT_EXPIRES: &str = "accountExpires";
pub const ATTR_PWD_LAST_SET: &str = "pwdLastSet";
pub const ATTR_ADMIN_COUNT: &str = "adminCount";

// Security and identity attributes
pub const ATTR_MSDS_CREATOR_SID: &str = "mS-DS-CreatorSID";
pub const ATTR_SID_HISTORY: &str = "sIDHistory";
pub const ATTR_NT_SECURITY_DESCRIPTOR: &str = "nTSecurityDescriptor";

// Time attributes
pub const ATTR_WHEN_CREATED: &str = "whenCreated";
pub const ATTR_WHEN_CHANGED: &str = "whenChanged";
pub const ATTR_LAST_LOGON: &str = "lastLogon";
pub const ATTR_LAST_LOGON_TIMESTAMP: &str = "lastLogonTimestamp";
pub const ATTR_BAD_PASSWORD_TIME: &str = "badPasswordTime";
pub const ATTR_DS_CORE_PROPAGATION_DATA: &str = "dSCorePropagationData";

// Delegation and authentication attributes
pub const ATTR_MSDS_ALLOWED_TO_ACT: &str = "msDS-AllowedToActOnBehalfOfOtherIdentity";
pub const ATTR_MSDS_ALLOWED_TO_DELEGATE_TO: &str = "msDS-AllowedToDelegateTo";
pub const ATTR_MSDS_SUPPORTED_ENCRYPTION_TYPES: &str = "msDS-SupportedEncryptionTypes";
pub const ATTR_SERVICE_PRINCIPAL_NAME: &str = "servicePrincipalName";
pub const ATTR_LOGON_HOURS: &str = "logonHours";
pub const ATTR_MSDS_GENERATION_ID: &str = "msDS-GenerationId";

// Computer attributes
pub const ATTR_OPERATING_SYSTEM: &str = "operatingSystem";
pub const ATTR_OPERATING_SYSTEM_VERSION: &str = "operatingSystemVersion";
pub const ATTR_DNS_HOST_NAME: &str = "dNSHostName";

// Group attributes
pub const ATTR_MEMBER: &str = "member";
pub const ATTR_MEMBER_OF: &str = "memberOf";
pub const ATTR_GROUP_TYPE: &str = "groupType";
pub const ATTR_MANAGED_BY: &str = "managedBy";

// Trust attributes
pub const ATTR_TRUST_DIRECTION: &str = "trustDirection";
pub const ATTR_TRUST_TYPE: &str = "trustType";
pub const ATTR_TRUST_ATTRIBUTES: &str = "trustAttributes";
pub const ATTR_FLAT_NAME: &str = "flatName";

// Display attributes
pub const ATTR_DISPLAY_NAME: &str = "displayName";

// GPO attributes
pub const ATTR_GPC_FILE_SYS_PATH: &str = "gPCFileSysPath";
pub const ATTR_GPC_MACHINE_EXTENSION_NAMES: &str = "gPCMachineExtensionNames";
pub const ATTR_GPC_USER_EXTENSION_NAMES: &str = "gPCUserExtensionNames";
pub const ATTR_VERSION_NUMBER: &str = "versionNumber";

// RootDSE attributes
pub const ATTR_SUPPORTED_CONTROL: &str = "supportedControl";
pub const ATTR_VENDOR_NAME: &str = "vendorName";
pub const ATTR_SUPPORTED_LDAP_VERSION: &str = "supportedLDAPVersion";
pub const ATTR_SUPPORTED_EXTENSIONS: &str = "supportedExtensions";

// LDAP matching rule and control OIDs
// These must appear literally in filter strings sent to the DC.
pub const OID_MATCH_RULE_BIT_OR: &str = "1.2.840.113556.1.4.803"; // LDAP_MATCHING_RULE_BIT_OR
pub const OID_MATCH_RULE_BIT_AND: &str = "1.2.840.113556.1.4.804"; // LDAP_MATCHING_RULE_BIT_AND
pub const OID_MATCH_RULE_IN_CHAIN: &str = "1.2.840.113556.1.4.1941"; // LDAP_MATCHING_RULE_IN_CHAIN
pub const OID_CONTROL_PAGED_RESULTS: &str = "1.2.840.113556.1.4.319"; // LDAP_PAGED_RESULT

// Defaults
pub const DEFAULT_LDAP_PORT: u16 = 389;
pub const DEFAULT_LDAPS_PORT: u16 = 636;
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGING_SIZE: i32 = 1000;

// Retry defaults
pub const DEFAULT_RETRY_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 100;
pub const DEFAULT_RETRY_MAX_DELAY_SECS: u64 = 5;
pub const DEFAULT_RETRY_MULTIPLIER: f64 = 2.0;

// Streaming defaults
pub const ENTRY_CHANNEL_CAPACITY: usize = 100;
