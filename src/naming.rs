//! Identifier → CLI name derivation
//!
//! Pure functions that turn operation ids, tags and parameter names into the
//! lower-kebab-case names used for groups, commands and flags.

use crate::spec::ParamLocation;

/// Verb prefixes collapsed to a bare command name, in priority order.
///
/// `"listTasks"` → `"list"`, `"cancelTask"` → `"cancel"`.
const VERB_PREFIXES: &[(&str, &str)] = &[
    ("list", "list"),
    ("get", "get"),
    ("create", "create"),
    ("update", "update"),
    ("delete", "delete"),
    ("start", "start"),
    ("stop", "stop"),
    ("cancel", "cancel"),
    ("ping", "ping"),
    ("subscribe", "subscribe"),
];

/// Group used for operations without a tag.
pub const DEFAULT_GROUP: &str = "default";

/// Derive a command name from an operationId.
///
/// A known verb prefix followed by an uppercase letter yields the bare verb;
/// anything else is kebab-cased in full.
pub fn derive_command_name(operation_id: &str) -> String {
    VERB_PREFIXES
        .iter()
        .find(|(prefix, _)| has_verb_boundary(operation_id, prefix))
        .map(|(_, verb)| (*verb).to_string())
        .unwrap_or_else(|| to_kebab_case(operation_id))
}

fn has_verb_boundary(operation_id: &str, prefix: &str) -> bool {
    operation_id
        .strip_prefix(prefix)
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_uppercase)
}

/// Derive a group name from a tag. Empty tags map to [`DEFAULT_GROUP`].
pub fn derive_group_name(tag: &str) -> String {
    if tag.is_empty() {
        return DEFAULT_GROUP.to_string();
    }
    to_kebab_case(tag)
}

/// Derive a flag name from a parameter name.
///
/// Header parameters lose a leading `X-` (any case): `X-Request-ID` → `request-id`.
pub fn derive_flag_name(param_name: &str, location: ParamLocation) -> String {
    let name = match location {
        ParamLocation::Header => strip_x_prefix(param_name),
        ParamLocation::Path | ParamLocation::Query => param_name,
    };
    to_kebab_case(name)
}

fn strip_x_prefix(name: &str) -> &str {
    match name.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("x-") => &name[2..],
        _ => name,
    }
}

/// Split a space-delimited command path and kebab-case each segment.
///
/// `"tasks activities"` → `["tasks", "activities"]`
pub fn parse_command_path(text: &str) -> Vec<String> {
    text.split_whitespace().map(to_kebab_case).collect()
}

/// Convert an identifier to lower-kebab-case.
///
/// A hyphen goes before an uppercase letter only when the previous character
/// is neither uppercase nor a separator, so acronyms stay together
/// (`UserID` → `user-id`). Running it on its own output is a no-op.
pub fn to_kebab_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev: Option<char> = None;

    for c in s.chars() {
        if c.is_uppercase() {
            if let Some(p) = prev {
                if !p.is_uppercase() && p != '-' && p != '_' {
                    result.push('-');
                }
            }
            result.extend(c.to_lowercase());
        } else if c == '_' || c == ' ' {
            result.push('-');
        } else {
            result.push(c);
        }
        prev = Some(c);
    }

    collapse_hyphens(&result)
}

fn collapse_hyphens(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- derive_command_name --

    #[test]
    fn derive_command_name_collapses_known_verbs() {
        let cases = [
            ("listTasks", "list"),
            ("getTasks", "get"),
            ("createTask", "create"),
            ("updateTask", "update"),
            ("deleteTask", "delete"),
            ("startProcess", "start"),
            ("stopProcess", "stop"),
            ("cancelTask", "cancel"),
            ("pingHealth", "ping"),
            ("subscribeStream", "subscribe"),
            ("getUserById", "get"),
        ];
        for (input, expected) in cases {
            assert_eq!(derive_command_name(input), expected, "input: {input}");
        }
    }

    #[test]
    fn derive_command_name_falls_back_to_kebab_case() {
        assert_eq!(
            derive_command_name("someCustomOperation"),
            "some-custom-operation"
        );
    }

    #[test]
    fn derive_command_name_requires_uppercase_boundary() {
        // "getaway" starts with "get" but is not followed by an uppercase letter
        assert_eq!(derive_command_name("getaway"), "getaway");
        assert_eq!(derive_command_name("listing"), "listing");
    }

    #[test]
    fn derive_command_name_bare_verb_is_not_a_match() {
        assert_eq!(derive_command_name("list"), "list");
        assert_eq!(derive_command_name("stop"), "stop");
    }

    #[test]
    fn derive_command_name_pascal_case_verb_is_kebab_cased() {
        assert_eq!(derive_command_name("ListPods"), "list-pods");
    }

    #[test]
    fn derive_command_name_empty() {
        assert_eq!(derive_command_name(""), "");
    }

    // -- derive_group_name --

    #[test]
    fn derive_group_name_empty_tag_is_default() {
        assert_eq!(derive_group_name(""), "default");
    }

    #[test]
    fn derive_group_name_kebab_cases_tag() {
        assert_eq!(derive_group_name("Workspaces"), "workspaces");
        assert_eq!(derive_group_name("User Accounts"), "user-accounts");
        assert_eq!(derive_group_name("taskRuns"), "task-runs");
    }

    // -- derive_flag_name --

    #[test]
    fn derive_flag_name_strips_x_prefix_for_headers() {
        assert_eq!(
            derive_flag_name("X-Request-ID", ParamLocation::Header),
            "request-id"
        );
        assert_eq!(derive_flag_name("X-User-Id", ParamLocation::Header), "user-id");
        assert_eq!(derive_flag_name("x-trace", ParamLocation::Header), "trace");
    }

    #[test]
    fn derive_flag_name_keeps_x_prefix_outside_headers() {
        assert_eq!(derive_flag_name("X-Mode", ParamLocation::Query), "x-mode");
    }

    #[test]
    fn derive_flag_name_kebab_cases_query_params() {
        assert_eq!(derive_flag_name("page", ParamLocation::Query), "page");
        assert_eq!(derive_flag_name("userId", ParamLocation::Query), "user-id");
        assert_eq!(derive_flag_name("someParam", ParamLocation::Query), "some-param");
    }

    #[test]
    fn derive_flag_name_short_header_name() {
        assert_eq!(derive_flag_name("X", ParamLocation::Header), "x");
    }

    // -- to_kebab_case --

    #[test]
    fn to_kebab_case_keeps_acronyms_together() {
        assert_eq!(to_kebab_case("UserID"), "user-id");
        assert_eq!(to_kebab_case("getHTTPStatus"), "get-httpstatus");
    }

    #[test]
    fn to_kebab_case_replaces_separators() {
        assert_eq!(to_kebab_case("snake_case_name"), "snake-case-name");
        assert_eq!(to_kebab_case("My Group"), "my-group");
        assert_eq!(to_kebab_case("a__b"), "a-b");
    }

    #[test]
    fn to_kebab_case_trims_hyphens() {
        assert_eq!(to_kebab_case("-leading-"), "leading");
        assert_eq!(to_kebab_case("_private"), "private");
    }

    #[test]
    fn to_kebab_case_no_hyphen_after_separator() {
        assert_eq!(to_kebab_case("Foo_Bar"), "foo-bar");
        assert_eq!(to_kebab_case("Foo-Bar"), "foo-bar");
    }

    #[test]
    fn to_kebab_case_is_idempotent() {
        for input in [
            "UserID",
            "someCustomOperation",
            "X-Request-ID",
            "My Cool_Group",
            "getHTTPStatus",
            "--weird__Input--",
            "v2Api",
        ] {
            let once = to_kebab_case(input);
            assert_eq!(to_kebab_case(&once), once, "input: {input}");
        }
    }

    #[test]
    fn to_kebab_case_empty() {
        assert_eq!(to_kebab_case(""), "");
    }

    // -- parse_command_path --

    #[test]
    fn parse_command_path_splits_and_kebab_cases() {
        assert_eq!(parse_command_path("tasks create"), vec!["tasks", "create"]);
        assert_eq!(
            parse_command_path("users get  profile"),
            vec!["users", "get", "profile"]
        );
        assert_eq!(parse_command_path("TasksCreate"), vec!["tasks-create"]);
    }

    #[test]
    fn parse_command_path_blank_is_empty() {
        assert!(parse_command_path("   ").is_empty());
    }
}
