use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Access group a user can belong to.
///
/// Persisted as a comma-separated string of these tags (e.g.
/// `"loggedInUser, notYetApprovedUsers"`), kept for wire compatibility
/// with existing user records and clients. In process the set is typed,
/// and every membership check is an exact match on one trimmed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessGroup {
    LoggedInUser,
    LoggedInUsers,
    NotYetApprovedUsers,
    Members,
    Admins,
    Anonymous,
}

impl AccessGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessGroup::LoggedInUser => "loggedInUser",
            AccessGroup::LoggedInUsers => "loggedInUsers",
            AccessGroup::NotYetApprovedUsers => "notYetApprovedUsers",
            AccessGroup::Members => "members",
            AccessGroup::Admins => "admins",
            AccessGroup::Anonymous => "anonymousUsers",
        }
    }
}

impl FromStr for AccessGroup {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loggedInUser" => Ok(AccessGroup::LoggedInUser),
            "loggedInUsers" => Ok(AccessGroup::LoggedInUsers),
            "notYetApprovedUsers" => Ok(AccessGroup::NotYetApprovedUsers),
            "members" => Ok(AccessGroup::Members),
            "admins" => Ok(AccessGroup::Admins),
            "anonymousUsers" => Ok(AccessGroup::Anonymous),
            other => anyhow::bail!("unknown access group tag: {other:?}"),
        }
    }
}

impl fmt::Display for AccessGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of access groups, serialized as the legacy comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessGroups(BTreeSet<AccessGroup>);

impl AccessGroups {
    pub fn new<I: IntoIterator<Item = AccessGroup>>(groups: I) -> Self {
        Self(groups.into_iter().collect())
    }

    /// Default groups for a fresh signup: logged in, awaiting approval.
    pub fn signup_default() -> Self {
        Self::new([AccessGroup::LoggedInUser, AccessGroup::NotYetApprovedUsers])
    }

    /// Groups an admin approval promotes a user to.
    pub fn approved() -> Self {
        Self::new([AccessGroup::LoggedInUsers, AccessGroup::Members])
    }

    pub fn contains(&self, group: AccessGroup) -> bool {
        self.0.contains(&group)
    }
}

impl fmt::Display for AccessGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for group in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(group.as_str())?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for AccessGroups {
    type Err = anyhow::Error;

    /// Parse the stored form: split on commas, trim each token, require
    /// every non-empty token to be a known tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut groups = BTreeSet::new();
        for token in s.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            groups.insert(token.parse::<AccessGroup>()?);
        }
        Ok(Self(groups))
    }
}

impl TryFrom<String> for AccessGroups {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Serialize for AccessGroups {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccessGroups {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_tokens() {
        let groups: AccessGroups = "loggedInUser, notYetApprovedUsers".parse().unwrap();
        assert!(groups.contains(AccessGroup::LoggedInUser));
        assert!(groups.contains(AccessGroup::NotYetApprovedUsers));
        assert!(!groups.contains(AccessGroup::Admins));
    }

    #[test]
    fn parses_unspaced_tokens() {
        let groups: AccessGroups = "loggedInUsers,members".parse().unwrap();
        assert!(groups.contains(AccessGroup::Members));
        assert!(!groups.contains(AccessGroup::LoggedInUser));
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!("loggedInUser, superusers".parse::<AccessGroups>().is_err());
    }

    #[test]
    fn membership_is_token_exact_not_substring() {
        // "notYetApprovedUsers" must not count as membership of "members"
        let groups: AccessGroups = "notYetApprovedUsers".parse().unwrap();
        assert!(!groups.contains(AccessGroup::Members));
    }

    #[test]
    fn signup_default_renders_legacy_string() {
        assert_eq!(
            AccessGroups::signup_default().to_string(),
            "loggedInUser, notYetApprovedUsers"
        );
    }

    #[test]
    fn roundtrips_through_display() {
        let groups = AccessGroups::approved();
        let parsed: AccessGroups = groups.to_string().parse().unwrap();
        assert_eq!(parsed, groups);
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&AccessGroups::signup_default()).unwrap();
        assert_eq!(json, "\"loggedInUser, notYetApprovedUsers\"");
    }
}
