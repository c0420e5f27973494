//! 정책 문서 로더 — 디렉토리의 YAML 정책 파일을 수집합니다.
//!
//! 각 문서의 최상위는 노드 시퀀스이며, 노드는 `list` / `macro` / `rule` /
//! `filter` 중 하나의 키를 가집니다. 알려지지 않은 필드는 경고 후
//! 무시합니다 (전방 호환). 같은 종류 내 이름 중복은 에러입니다.

use std::collections::HashSet;
use std::path::Path;

use serde_yaml::Value;

use flowgate_core::error::ConfigError;

use crate::error::PolicyError;

use super::types::{Action, FilterDef, ListDef, MacroDef, PolicySet, Priority, RuleDef};

/// 디렉토리에서 모든 YAML 정책 파일을 로드합니다.
///
/// 파일은 경로 순으로 정렬되어 선언 순서가 결정적입니다.
///
/// # Errors
/// - 디렉토리가 없거나 읽을 수 없는 경우
/// - `.yaml`/`.yml` 파일이 하나도 없는 경우
/// - 문서 파싱/수집 오류
pub async fn load_directory(dir: impl AsRef<Path>) -> Result<PolicySet, PolicyError> {
    let dir = dir.as_ref();

    let mut entries = tokio::fs::read_dir(dir).await.map_err(|_| {
        PolicyError::Config(ConfigError::PoliciesNotFound {
            path: dir.display().to_string(),
        })
    })?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| {
        PolicyError::Config(ConfigError::Unreadable {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })
    })? {
        let path = entry.path();
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if is_yaml {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(PolicyError::Config(ConfigError::EmptyPolicyDir {
            path: dir.display().to_string(),
        }));
    }
    paths.sort();

    let mut set = PolicySet::default();
    let mut seen = SeenNames::default();
    for path in &paths {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            PolicyError::Config(ConfigError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        parse_document(&text, &path.display().to_string(), &mut set, &mut seen)?;
    }

    tracing::info!(
        dir = %dir.display(),
        lists = set.lists.len(),
        macros = set.macros.len(),
        rules = set.rules.len(),
        filters = set.filters.len(),
        "loaded policy documents"
    );

    Ok(set)
}

/// 종류별 이름 중복 추적
#[derive(Default)]
pub(crate) struct SeenNames {
    lists: HashSet<String>,
    macros: HashSet<String>,
    rules: HashSet<String>,
    filters: HashSet<String>,
}

/// 하나의 YAML 문서를 파싱해 정책 집합에 누적합니다.
pub(crate) fn parse_document(
    text: &str,
    file: &str,
    set: &mut PolicySet,
    seen: &mut SeenNames,
) -> Result<(), PolicyError> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| PolicyError::Yaml {
        file: file.to_owned(),
        reason: e.to_string(),
    })?;

    let nodes = match value {
        Value::Null => {
            tracing::warn!(file, "empty policy document");
            return Ok(());
        }
        Value::Sequence(nodes) => nodes,
        _ => {
            return Err(PolicyError::Yaml {
                file: file.to_owned(),
                reason: "top level must be a sequence of policy nodes".to_owned(),
            })
        }
    };

    for node in nodes {
        let Value::Mapping(map) = node else {
            return Err(PolicyError::Yaml {
                file: file.to_owned(),
                reason: "policy node must be a mapping".to_owned(),
            });
        };
        parse_node(&map, file, set, seen)?;
    }

    Ok(())
}

fn parse_node(
    map: &serde_yaml::Mapping,
    file: &str,
    set: &mut PolicySet,
    seen: &mut SeenNames,
) -> Result<(), PolicyError> {
    if let Some(name) = get_str(map, "list") {
        warn_unknown_keys(map, file, &["list", "items"]);
        let items = get_scalar_seq(map, "items").ok_or(PolicyError::MissingField {
            file: file.to_owned(),
            kind: "list",
            name: name.clone(),
            field: "items",
        })?;
        if !seen.lists.insert(name.clone()) {
            return Err(duplicate("list", name, file));
        }
        set.lists.push(ListDef { name, items });
        return Ok(());
    }

    if let Some(name) = get_str(map, "macro") {
        warn_unknown_keys(map, file, &["macro", "condition"]);
        let condition = get_str(map, "condition").ok_or(PolicyError::MissingField {
            file: file.to_owned(),
            kind: "macro",
            name: name.clone(),
            field: "condition",
        })?;
        if !seen.macros.insert(name.clone()) {
            return Err(duplicate("macro", name, file));
        }
        set.macros.push(MacroDef { name, condition });
        return Ok(());
    }

    if let Some(name) = get_str(map, "filter") {
        warn_unknown_keys(map, file, &["filter", "condition"]);
        let condition = get_str(map, "condition").ok_or(PolicyError::MissingField {
            file: file.to_owned(),
            kind: "filter",
            name: name.clone(),
            field: "condition",
        })?;
        if !seen.filters.insert(name.clone()) {
            return Err(duplicate("filter", name, file));
        }
        set.filters.push(FilterDef { name, condition });
        return Ok(());
    }

    if let Some(name) = get_str(map, "rule") {
        warn_unknown_keys(
            map,
            file,
            &[
                "rule",
                "desc",
                "condition",
                "action",
                "priority",
                "tags",
                "prefilter",
                "enabled",
            ],
        );
        let condition = get_str(map, "condition").ok_or(PolicyError::MissingField {
            file: file.to_owned(),
            kind: "rule",
            name: name.clone(),
            field: "condition",
        })?;
        let desc = get_str(map, "desc").unwrap_or_default();

        let mut actions = Vec::new();
        for raw in get_scalar_seq(map, "action").unwrap_or_default() {
            let action: Action = raw.parse().map_err(|reason| PolicyError::Yaml {
                file: file.to_owned(),
                reason,
            })?;
            actions.push(action);
        }

        let priority = match get_str(map, "priority") {
            Some(raw) => raw.parse::<Priority>().map_err(|reason| PolicyError::Yaml {
                file: file.to_owned(),
                reason,
            })?,
            None => Priority::default(),
        };

        let tags = get_scalar_seq(map, "tags").unwrap_or_default();
        let prefilter = get_scalar_seq(map, "prefilter").unwrap_or_default();
        let enabled = match map.get("enabled") {
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(PolicyError::Yaml {
                    file: file.to_owned(),
                    reason: format!("'enabled' of rule '{name}' must be a boolean"),
                })
            }
            None => true,
        };

        if !seen.rules.insert(name.clone()) {
            return Err(duplicate("rule", name, file));
        }
        set.rules.push(RuleDef {
            name,
            desc,
            condition,
            actions,
            priority,
            tags,
            prefilter,
            enabled,
        });
        return Ok(());
    }

    let keys = map
        .keys()
        .filter_map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Err(PolicyError::UnknownNode {
        file: file.to_owned(),
        keys,
    })
}

fn duplicate(kind: &'static str, name: String, file: &str) -> PolicyError {
    PolicyError::DuplicateName {
        kind,
        name,
        file: file.to_owned(),
    }
}

fn get_str(map: &serde_yaml::Mapping, key: &str) -> Option<String> {
    scalar_to_string(map.get(key)?)
}

/// 스칼라 시퀀스를 문자열 목록으로 변환합니다. 숫자 항목은 그대로
/// 십진 문자열이 됩니다. 단일 스칼라도 허용합니다 (`action: alert`).
fn get_scalar_seq(map: &serde_yaml::Mapping, key: &str) -> Option<Vec<String>> {
    match map.get(key)? {
        Value::Sequence(seq) => Some(seq.iter().filter_map(scalar_to_string).collect()),
        scalar => scalar_to_string(scalar).map(|s| vec![s]),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn warn_unknown_keys(map: &serde_yaml::Mapping, file: &str, known: &[&str]) {
    for key in map.keys() {
        if let Some(key) = key.as_str() {
            if !known.contains(&key) {
                tracing::warn!(file, key, "ignoring unknown policy field");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<PolicySet, PolicyError> {
        let mut set = PolicySet::default();
        let mut seen = SeenNames::default();
        parse_document(text, "test.yaml", &mut set, &mut seen)?;
        Ok(set)
    }

    #[test]
    fn parses_all_node_kinds() {
        let set = parse(
            r#"
- list: pkg_bins
  items: [apt, dnf, yum]
- macro: is_exec
  condition: sf.opflags = EXEC
- filter: containers
  condition: sf.container.type != host
- rule: pkg_install
  desc: package installer launched
  condition: is_exec and sf.proc.exe in (pkg_bins)
  action: [alert]
  priority: high
  tags: [software_mgmt]
  prefilter: [PE]
"#,
        )
        .unwrap();
        assert_eq!(set.lists.len(), 1);
        assert_eq!(set.macros.len(), 1);
        assert_eq!(set.filters.len(), 1);
        assert_eq!(set.rules.len(), 1);
        let rule = &set.rules[0];
        assert_eq!(rule.actions, vec![Action::Alert]);
        assert_eq!(rule.priority, Priority::Critical);
        assert!(rule.enabled);
    }

    #[test]
    fn numeric_list_items_become_strings() {
        let set = parse("- list: ports\n  items: [22, 80, 443]\n").unwrap();
        assert_eq!(set.lists[0].items, vec!["22", "80", "443"]);
    }

    #[test]
    fn single_scalar_action_is_accepted() {
        let set = parse(
            "- rule: r\n  condition: sf.opflags = EXEC\n  action: alert\n",
        )
        .unwrap();
        assert_eq!(set.rules[0].actions, vec![Action::Alert]);
    }

    #[test]
    fn rule_without_action_is_empty_action_set() {
        let set = parse("- rule: r\n  condition: sf.opflags = EXEC\n").unwrap();
        assert!(set.rules[0].actions.is_empty());
    }

    #[test]
    fn missing_condition_is_an_error() {
        let err = parse("- macro: broken\n").unwrap_err();
        assert!(matches!(err, PolicyError::MissingField { field: "condition", .. }));
    }

    #[test]
    fn missing_items_is_an_error() {
        let err = parse("- list: broken\n").unwrap_err();
        assert!(matches!(err, PolicyError::MissingField { field: "items", .. }));
    }

    #[test]
    fn duplicate_rule_name_is_an_error() {
        let err = parse(
            r#"
- rule: same
  condition: sf.opflags = EXEC
- rule: same
  condition: sf.opflags = EXIT
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::DuplicateName { kind: "rule", .. }
        ));
    }

    #[test]
    fn same_name_across_kinds_is_allowed() {
        let set = parse(
            r#"
- macro: shared
  condition: sf.opflags = EXEC
- filter: shared
  condition: sf.container.type != host
"#,
        )
        .unwrap();
        assert_eq!(set.macros.len(), 1);
        assert_eq!(set.filters.len(), 1);
    }

    #[test]
    fn node_without_kind_key_is_an_error() {
        let err = parse("- widget: x\n  condition: a = b\n").unwrap_err();
        assert!(matches!(err, PolicyError::UnknownNode { .. }));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let set = parse(
            "- rule: r\n  condition: sf.opflags = EXEC\n  output: some falco field\n",
        )
        .unwrap();
        assert_eq!(set.rules.len(), 1);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(matches!(
            parse("- rule: [unclosed").unwrap_err(),
            PolicyError::Yaml { .. }
        ));
    }

    #[test]
    fn disabled_rule_keeps_flag() {
        let set = parse(
            "- rule: r\n  condition: sf.opflags = EXEC\n  enabled: false\n",
        )
        .unwrap();
        assert!(!set.rules[0].enabled);
    }

    #[tokio::test]
    async fn load_nonexistent_directory_is_config_error() {
        let err = load_directory("/nonexistent/flowgate/policies")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::Config(ConfigError::PoliciesNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn load_empty_directory_is_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_directory(dir.path()).await.unwrap_err();
        assert!(matches!(
            err,
            PolicyError::Config(ConfigError::EmptyPolicyDir { .. })
        ));
    }

    #[tokio::test]
    async fn load_directory_collects_files_in_path_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        tokio::fs::write(
            dir.path().join("b_rules.yaml"),
            "- rule: second\n  condition: sf.opflags = EXIT\n",
        )
        .await
        .unwrap();
        tokio::fs::write(
            dir.path().join("a_rules.yaml"),
            "- rule: first\n  condition: sf.opflags = EXEC\n",
        )
        .await
        .unwrap();
        let set = load_directory(dir.path()).await.unwrap();
        assert_eq!(set.rules[0].name, "first");
        assert_eq!(set.rules[1].name, "second");
    }
}
