//! 정책 인터프리터 — 컴파일된 정책을 레코드마다 적용
//!
//! 세 가지 모드로 동작합니다:
//! - **alert**: 전역 필터 통과 후 규칙을 선언 순서로 평가, 매칭된 규칙마다
//!   보강된 레코드를 하나씩 출력합니다.
//! - **filter**: 전역 필터만 적용하고 통과 레코드를 그대로 출력합니다.
//! - **bypass**: 모든 레코드를 무변경 통과시킵니다.
//!
//! 레코드 평가는 출력 방출 외의 부작용이 없습니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use flowgate_core::config::EngineMode;
use flowgate_core::record::FlatRecord;
use flowgate_core::schema::UNKNOWN_TYPE_SYMBOL;

use crate::cache::AncestryCache;
use crate::compiler::{CompiledPolicy, CompiledRule};
use crate::lang::types::{Action, Priority};

/// 보강된 출력 레코드
///
/// bypass/filter 모드와 빈 액션 규칙의 출력은 입력과 동일한 레코드를
/// 공유하며 보강 필드가 비어 있습니다.
#[derive(Debug, Clone)]
pub struct EnrichedRecord {
    /// 원본 플랫 레코드
    pub record: Arc<FlatRecord>,
    /// 알림 여부 (`alert` 액션)
    pub alert: bool,
    /// 매칭된 규칙 이름 (알림에만 부착)
    pub rule_name: Option<String>,
    /// 규칙 설명
    pub desc: Option<String>,
    /// 규칙 우선순위
    pub priority: Option<Priority>,
    /// 부착된 태그
    pub tags: Vec<String>,
}

impl EnrichedRecord {
    /// 보강 없는 통과 레코드
    fn passthrough(record: Arc<FlatRecord>) -> Self {
        Self {
            record,
            alert: false,
            rule_name: None,
            desc: None,
            priority: None,
            tags: Vec::new(),
        }
    }

    fn from_rule(record: Arc<FlatRecord>, rule: &CompiledRule) -> Self {
        let alert = rule.actions.contains(&Action::Alert);
        if alert {
            Self {
                record,
                alert: true,
                rule_name: Some(rule.name.clone()),
                desc: Some(rule.desc.clone()),
                priority: Some(rule.priority),
                tags: rule.tags.clone(),
            }
        } else if rule.actions.contains(&Action::Tag) {
            Self {
                record,
                alert: false,
                rule_name: None,
                desc: None,
                priority: None,
                tags: rule.tags.clone(),
            }
        } else {
            Self::passthrough(record)
        }
    }
}

/// 인터프리터 통계
#[derive(Debug, Default)]
pub struct InterpreterStats {
    /// 수신 레코드 수
    pub processed: AtomicU64,
    /// 전역 필터로 버려진 레코드 수
    pub filtered_out: AtomicU64,
    /// 규칙 매칭 횟수
    pub matched: AtomicU64,
    /// 방출한 출력 레코드 수
    pub emitted: AtomicU64,
}

impl InterpreterStats {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn filtered_out(&self) -> u64 {
        self.filtered_out.load(Ordering::Relaxed)
    }

    pub fn matched(&self) -> u64 {
        self.matched.load(Ordering::Relaxed)
    }

    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

/// 정책 인터프리터
///
/// 컴파일된 정책과 조상 캐시는 불변/공유 자원이므로 여러 워커가 같은
/// 인터프리터를 `Arc`로 공유할 수 있습니다.
pub struct PolicyInterpreter {
    mode: EngineMode,
    policy: Arc<CompiledPolicy>,
    cache: Arc<AncestryCache>,
    stats: Arc<InterpreterStats>,
}

impl PolicyInterpreter {
    pub fn new(mode: EngineMode, policy: Arc<CompiledPolicy>, cache: Arc<AncestryCache>) -> Self {
        Self {
            mode,
            policy,
            cache,
            stats: Arc::new(InterpreterStats::default()),
        }
    }

    /// 통계 핸들
    pub fn stats(&self) -> Arc<InterpreterStats> {
        Arc::clone(&self.stats)
    }

    /// 레코드 하나를 평가하고 출력마다 `on_result`를 호출합니다.
    ///
    /// 하나의 입력에 대한 출력은 규칙 선언 순서를 따릅니다.
    pub fn process(&self, record: Arc<FlatRecord>, mut on_result: impl FnMut(EnrichedRecord)) {
        self.stats.processed.fetch_add(1, Ordering::Relaxed);

        if self.mode == EngineMode::Bypass {
            on_result(EnrichedRecord::passthrough(record));
            return;
        }

        for filter in &self.policy.filters {
            if !filter.expr.eval(&record, &self.cache) {
                self.stats.filtered_out.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(filter = %filter.name, "record dropped by global filter");
                return;
            }
        }

        if self.mode == EngineMode::Filter {
            on_result(EnrichedRecord::passthrough(record));
            return;
        }

        let symbol = record
            .kind()
            .map_or(UNKNOWN_TYPE_SYMBOL, |kind| kind.symbol());

        for rule in &self.policy.rules {
            if !rule.enabled {
                continue;
            }
            // 프리필터: 조건 평가 전의 저렴한 레코드 타입 검사
            if !rule.prefilter.is_empty() && !rule.prefilter.iter().any(|t| t == symbol) {
                continue;
            }
            if rule.expr.eval(&record, &self.cache) {
                self.stats.matched.fetch_add(1, Ordering::Relaxed);
                on_result(EnrichedRecord::from_rule(Arc::clone(&record), rule));
            }
        }
    }

    /// 인터프리터 워커 루프
    ///
    /// 여러 워커가 입력 수신자를 공유할 수 있도록 수신자는 뮤텍스로
    /// 감쌉니다. 워커가 둘 이상이면 워커 간 출력 순서는 보장되지
    /// 않습니다.
    pub async fn run(
        self: Arc<Self>,
        rx: Arc<Mutex<mpsc::Receiver<FlatRecord>>>,
        tx: mpsc::Sender<EnrichedRecord>,
    ) {
        tracing::info!(mode = ?self.mode, "starting policy interpreter worker");
        loop {
            let record = { rx.lock().await.recv().await };
            let Some(record) = record else { break };

            let record = Arc::new(record);
            let mut outputs = Vec::new();
            self.process(record, |out| outputs.push(out));
            for out in outputs {
                if tx.send(out).await.is_err() {
                    tracing::warn!("output channel closed, stopping interpreter worker");
                    return;
                }
                self.stats.emitted.fetch_add(1, Ordering::Relaxed);
            }
        }
        tracing::info!(
            processed = self.stats.processed(),
            matched = self.stats.matched(),
            "input channel closed, interpreter worker done"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use flowgate_core::flags::op;
    use flowgate_core::schema::{IntSlot, RecordKind, Source, StrSlot};
    use flowgate_core::table::ProcessStore;

    use crate::compiler::compile;
    use crate::lang::loader;
    use crate::lang::types::PolicySet;

    fn parse_policy(yaml: &str) -> PolicySet {
        let mut set = PolicySet::default();
        let mut seen = Default::default();
        loader::parse_document(yaml, "test.yaml", &mut set, &mut seen).expect("policy parses");
        set
    }

    fn interpreter(mode: EngineMode, yaml: &str) -> PolicyInterpreter {
        let policy = Arc::new(compile(&parse_policy(yaml)).expect("policy compiles"));
        let cache = Arc::new(AncestryCache::new(Arc::new(ProcessStore::new()), 64));
        PolicyInterpreter::new(mode, policy, cache)
    }

    fn exec_record(exe: &str) -> Arc<FlatRecord> {
        let mut r = FlatRecord::new();
        r.set_int(Source::SysFlow, IntSlot::RecType, RecordKind::ProcEvt.code());
        r.set_int(Source::SysFlow, IntSlot::EvProcOpFlags, op::EXEC);
        r.set_str(Source::SysFlow, StrSlot::ProcExe, exe);
        Arc::new(r)
    }

    fn collect(pi: &PolicyInterpreter, record: Arc<FlatRecord>) -> Vec<EnrichedRecord> {
        let mut out = Vec::new();
        pi.process(record, |e| out.push(e));
        out
    }

    const PKG_POLICY: &str = r#"
- list: pkg_bins
  items: [apt, dnf, yum]
- rule: pkg_install
  desc: package installer launched
  condition: sf.opflags = EXEC and sf.proc.name in (pkg_bins)
  action: [alert]
  priority: high
  tags: [software_mgmt]
"#;

    #[test]
    fn alert_mode_enriches_matching_record() {
        let pi = interpreter(EngineMode::Alert, PKG_POLICY);
        let outputs = collect(&pi, exec_record("/usr/bin/apt"));
        assert_eq!(outputs.len(), 1);
        let out = &outputs[0];
        assert!(out.alert);
        assert_eq!(out.rule_name.as_deref(), Some("pkg_install"));
        assert_eq!(out.desc.as_deref(), Some("package installer launched"));
        assert_eq!(out.priority, Some(Priority::Critical));
        assert_eq!(out.tags, vec!["software_mgmt"]);
    }

    #[test]
    fn alert_mode_drops_non_matching_record() {
        let pi = interpreter(EngineMode::Alert, PKG_POLICY);
        assert!(collect(&pi, exec_record("/usr/bin/vim")).is_empty());
    }

    #[test]
    fn multiple_matches_emit_in_declaration_order() {
        let yaml = r#"
- rule: second_declared_first
  condition: sf.opflags = EXEC
  action: [alert]
- rule: also_matches
  condition: sf.proc.name = apt
  action: [alert]
"#;
        let pi = interpreter(EngineMode::Alert, yaml);
        let outputs = collect(&pi, exec_record("/usr/bin/apt"));
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].rule_name.as_deref(), Some("second_declared_first"));
        assert_eq!(outputs[1].rule_name.as_deref(), Some("also_matches"));
    }

    #[test]
    fn tag_action_merges_tags_without_alert() {
        let yaml = r#"
- rule: tagger
  condition: sf.opflags = EXEC
  action: [tag]
  tags: [observed]
"#;
        let pi = interpreter(EngineMode::Alert, yaml);
        let outputs = collect(&pi, exec_record("/usr/bin/apt"));
        assert_eq!(outputs.len(), 1);
        assert!(!outputs[0].alert);
        assert!(outputs[0].rule_name.is_none());
        assert_eq!(outputs[0].tags, vec!["observed"]);
    }

    #[test]
    fn empty_action_rule_passes_record_through() {
        let yaml = r#"
- rule: no_action
  condition: sf.opflags = EXEC
"#;
        let pi = interpreter(EngineMode::Alert, yaml);
        let record = exec_record("/usr/bin/apt");
        let outputs = collect(&pi, Arc::clone(&record));
        assert_eq!(outputs.len(), 1);
        assert!(!outputs[0].alert);
        assert!(outputs[0].tags.is_empty());
        assert_eq!(outputs[0].record, record);
    }

    #[test]
    fn disabled_rule_is_skipped() {
        let yaml = r#"
- rule: off
  condition: sf.opflags = EXEC
  action: [alert]
  enabled: false
"#;
        let pi = interpreter(EngineMode::Alert, yaml);
        assert!(collect(&pi, exec_record("/usr/bin/apt")).is_empty());
    }

    #[test]
    fn prefilter_skips_other_record_types() {
        let yaml = r#"
- rule: file_events_only
  condition: sf.opflags = EXEC or sf.type = PE
  action: [alert]
  prefilter: [FE]
"#;
        let pi = interpreter(EngineMode::Alert, yaml);
        // 조건 자체는 참이지만 prefilter가 PE 레코드를 걸러냅니다
        assert!(collect(&pi, exec_record("/usr/bin/apt")).is_empty());
    }

    #[test]
    fn global_filter_drops_before_rules() {
        let yaml = r#"
- filter: host_only
  condition: sf.container.type != host
- rule: everything
  condition: sf.opflags = EXEC
  action: [alert]
"#;
        let pi = interpreter(EngineMode::Alert, yaml);
        let mut r = FlatRecord::new();
        r.set_int(Source::SysFlow, IntSlot::RecType, RecordKind::ProcEvt.code());
        r.set_int(Source::SysFlow, IntSlot::EvProcOpFlags, op::EXEC);
        r.set_int(Source::SysFlow, IntSlot::ContType, 10); // host
        assert!(collect(&pi, Arc::new(r)).is_empty());
        assert_eq!(pi.stats().filtered_out(), 1);
        // 컨테이너 레코드는 통과
        let outputs = collect(&pi, exec_record("/usr/bin/apt"));
        assert_eq!(outputs.len(), 1);
    }

    #[test]
    fn filter_mode_skips_rule_evaluation() {
        let yaml = r#"
- filter: host_only
  condition: sf.container.type != host
- rule: everything
  condition: sf.opflags = EXEC
  action: [alert]
"#;
        let pi = interpreter(EngineMode::Filter, yaml);
        let outputs = collect(&pi, exec_record("/usr/bin/apt"));
        assert_eq!(outputs.len(), 1);
        assert!(!outputs[0].alert);
        assert_eq!(pi.stats().matched(), 0);
    }

    #[test]
    fn vacuously_true_filter_drops_nothing() {
        let yaml = r#"
- filter: let_all
  condition: sf.net.dport >= 0
"#;
        let pi = interpreter(EngineMode::Filter, yaml);
        let outputs = collect(&pi, exec_record("/usr/bin/apt"));
        assert_eq!(outputs.len(), 1);
        assert_eq!(pi.stats().filtered_out(), 0);
    }

    #[test]
    fn bypass_mode_emits_identical_record() {
        let pi = interpreter(EngineMode::Bypass, "- rule: unused\n  condition: sf.opflags = EXEC\n");
        let record = exec_record("/usr/bin/apt");
        let outputs = collect(&pi, Arc::clone(&record));
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].record, record);
        assert!(!outputs[0].alert);
    }

    #[test]
    fn empty_in_list_never_matches() {
        let yaml = r#"
- list: empty
  items: []
- rule: never
  condition: sf.proc.name in (empty)
  action: [alert]
"#;
        let pi = interpreter(EngineMode::Alert, yaml);
        assert!(collect(&pi, exec_record("/usr/bin/apt")).is_empty());
    }

    #[test]
    fn falco_alias_matches_same_getter() {
        let yaml = r#"
- rule: falco_style
  condition: proc.name = apt
  action: [alert]
"#;
        let pi = interpreter(EngineMode::Alert, yaml);
        let outputs = collect(&pi, exec_record("/usr/bin/apt"));
        assert_eq!(outputs.len(), 1);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let pi = interpreter(EngineMode::Alert, PKG_POLICY);
        let record = exec_record("/usr/bin/apt");
        let first: Vec<_> = collect(&pi, Arc::clone(&record))
            .into_iter()
            .map(|e| e.rule_name)
            .collect();
        let second: Vec<_> = collect(&pi, record)
            .into_iter()
            .map(|e| e.rule_name)
            .collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn worker_loop_emits_and_closes() {
        let pi = Arc::new(interpreter(EngineMode::Alert, PKG_POLICY));
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let rx = Arc::new(Mutex::new(in_rx));

        let handle = tokio::spawn(Arc::clone(&pi).run(rx, out_tx));

        let record = exec_record("/usr/bin/apt");
        in_tx.send((*record).clone()).await.unwrap();
        in_tx.send((*exec_record("/usr/bin/vim")).clone()).await.unwrap();
        drop(in_tx);

        let out = out_rx.recv().await.expect("one alert expected");
        assert_eq!(out.rule_name.as_deref(), Some("pkg_install"));
        assert!(out_rx.recv().await.is_none());
        handle.await.unwrap();
        assert_eq!(pi.stats().processed(), 2);
        assert_eq!(pi.stats().emitted(), 1);
    }
}
