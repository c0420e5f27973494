//! 조상 캐시 — OID별 파생 속성 메모
//!
//! 프로세스 OID의 첫 조회 시 프로세스 테이블의 부모 체인을 따라가며
//! 조상 목록(aname/aexe/acmdline/apid)과 부모 스냅샷 속성을 실체화해
//! 캐싱합니다. 읽기가 압도적으로 많아 reader-writer 락으로 보호하며,
//! 용량 한도 초과 시 두 세대 교대 방식으로 오래된 엔트리를 퇴거합니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use flowgate_core::record::Oid;
use flowgate_core::table::{ProcessSnapshot, ProcessTable};

use crate::mapper::{basename, Value, ValueKind, LIST_SEP};

/// 조상 체인 추적 깊이 한도
const MAX_ANCESTRY_DEPTH: usize = 32;

/// 캐시에서 해석되는 파생 속성
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedAttr {
    /// 조상 프로세스 이름 목록 (부모 → 루트)
    AName,
    /// 조상 실행 파일 경로 목록
    AExe,
    /// 조상 커맨드라인 목록
    ACmdLine,
    /// 조상 PID 목록
    APid,
    /// 부모 프로세스 이름
    PName,
    /// 부모 실행 파일 경로
    PExe,
    /// 부모 실행 인자
    PArgs,
    /// 부모 커맨드라인
    PCmdLine,
    PUid,
    PUser,
    PGid,
    PGroup,
    PTty,
    PEntry,
}

impl CachedAttr {
    /// 속성의 정적 값 타입
    pub fn kind(self) -> ValueKind {
        match self {
            Self::PUid | Self::PGid => ValueKind::Int,
            Self::PTty | Self::PEntry => ValueKind::Bool,
            _ => ValueKind::Str,
        }
    }

    fn zero(self) -> Value {
        match self.kind() {
            ValueKind::Int => Value::Int(0),
            ValueKind::Str => Value::Str(String::new()),
            ValueKind::Bool => Value::Bool(false),
        }
    }
}

/// 실체화된 캐시 엔트리
///
/// 목록 속성은 구분자로 결합된 문자열로 보관됩니다 (부모 → 루트 순).
#[derive(Debug, Default)]
struct CachedEntry {
    aname: String,
    aexe: String,
    acmdline: String,
    apid: String,
    parent: Option<ProcessSnapshot>,
}

/// 캐시 조회 통계
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// 두 세대로 관리되는 엔트리 저장소
#[derive(Default)]
struct Generations {
    current: HashMap<Oid, Arc<CachedEntry>>,
    previous: HashMap<Oid, Arc<CachedEntry>>,
}

/// OID → 파생 속성 캐시
///
/// `capacity`는 엔트리 수 상한입니다. current 세대가 용량의 절반에
/// 이르면 previous 세대를 버리고 교대하므로, 상주 엔트리 수는 용량을
/// 넘지 않고 최근 참조 엔트리가 우선 보존됩니다.
pub struct AncestryCache {
    table: Arc<dyn ProcessTable>,
    capacity: usize,
    generations: RwLock<Generations>,
    stats: CacheStats,
}

impl AncestryCache {
    /// 프로세스 테이블과 용량 한도로 캐시를 만듭니다.
    pub fn new(table: Arc<dyn ProcessTable>, capacity: usize) -> Self {
        Self {
            table,
            capacity: capacity.max(2),
            generations: RwLock::new(Generations::default()),
            stats: CacheStats::default(),
        }
    }

    /// 조회 통계
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// 현재 상주 엔트리 수
    pub fn len(&self) -> usize {
        let gens = self.generations.read();
        gens.current.len() + gens.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// OID의 파생 속성 값을 돌려줍니다.
    ///
    /// 프로세스 테이블에서 체인을 해석할 수 없으면 속성 타입의 0 값으로
    /// 대체합니다 (레코드 단위 비치명 처리).
    pub fn value(&self, oid: Oid, attr: CachedAttr) -> Value {
        if oid.is_zero() {
            return attr.zero();
        }
        let entry = self.entry(oid);
        match attr {
            CachedAttr::AName => Value::Str(entry.aname.clone()),
            CachedAttr::AExe => Value::Str(entry.aexe.clone()),
            CachedAttr::ACmdLine => Value::Str(entry.acmdline.clone()),
            CachedAttr::APid => Value::Str(entry.apid.clone()),
            CachedAttr::PName => match &entry.parent {
                Some(p) => Value::Str(basename(&p.exe).to_owned()),
                None => attr.zero(),
            },
            CachedAttr::PExe => match &entry.parent {
                Some(p) => Value::Str(p.exe.clone()),
                None => attr.zero(),
            },
            CachedAttr::PArgs => match &entry.parent {
                Some(p) => Value::Str(p.exe_args.clone()),
                None => attr.zero(),
            },
            CachedAttr::PCmdLine => match &entry.parent {
                Some(p) => Value::Str(cmdline(p)),
                None => attr.zero(),
            },
            CachedAttr::PUid => match &entry.parent {
                Some(p) => Value::Int(p.uid),
                None => attr.zero(),
            },
            CachedAttr::PUser => match &entry.parent {
                Some(p) => Value::Str(p.user_name.clone()),
                None => attr.zero(),
            },
            CachedAttr::PGid => match &entry.parent {
                Some(p) => Value::Int(p.gid),
                None => attr.zero(),
            },
            CachedAttr::PGroup => match &entry.parent {
                Some(p) => Value::Str(p.group_name.clone()),
                None => attr.zero(),
            },
            CachedAttr::PTty => match &entry.parent {
                Some(p) => Value::Bool(p.tty),
                None => attr.zero(),
            },
            CachedAttr::PEntry => match &entry.parent {
                Some(p) => Value::Bool(p.entry),
                None => attr.zero(),
            },
        }
    }

    /// 엔트리를 조회하거나 실체화합니다.
    fn entry(&self, oid: Oid) -> Arc<CachedEntry> {
        {
            let gens = self.generations.read();
            if let Some(entry) = gens.current.get(&oid) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Arc::clone(entry);
            }
        }

        // previous 세대 적중은 current로 승격
        {
            let mut gens = self.generations.write();
            if let Some(entry) = gens.previous.get(&oid).cloned() {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                self.insert_rotating(&mut gens, oid, Arc::clone(&entry));
                return entry;
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(self.build(oid));
        let mut gens = self.generations.write();
        self.insert_rotating(&mut gens, oid, Arc::clone(&entry));
        entry
    }

    fn insert_rotating(&self, gens: &mut Generations, oid: Oid, entry: Arc<CachedEntry>) {
        if gens.current.len() >= self.capacity / 2 {
            gens.previous = std::mem::take(&mut gens.current);
        }
        gens.current.insert(oid, entry);
    }

    /// 부모 체인을 따라가며 엔트리를 실체화합니다.
    ///
    /// 자기 자신은 목록에서 제외되며, 체인은 첫 번째 미등록 부모 또는
    /// 깊이 한도에서 끊깁니다.
    fn build(&self, oid: Oid) -> CachedEntry {
        let Some(subject) = self.table.get(&oid) else {
            tracing::warn!(oid = %oid, "ancestry lookup failed, using zero values");
            return CachedEntry::default();
        };

        let mut names = Vec::new();
        let mut exes = Vec::new();
        let mut cmdlines = Vec::new();
        let mut pids = Vec::new();

        let parent = subject.poid.and_then(|poid| self.table.get(&poid));

        let mut next = subject.poid;
        let mut depth = 0;
        while let Some(poid) = next {
            if depth >= MAX_ANCESTRY_DEPTH {
                tracing::warn!(oid = %oid, depth, "ancestry chain exceeds depth cap, truncating");
                break;
            }
            let Some(ancestor) = self.table.get(&poid) else {
                break;
            };
            names.push(basename(&ancestor.exe).to_owned());
            exes.push(ancestor.exe.clone());
            cmdlines.push(cmdline(&ancestor));
            pids.push(ancestor.oid.hpid.to_string());
            next = ancestor.poid;
            depth += 1;
        }

        CachedEntry {
            aname: names.join(LIST_SEP),
            aexe: exes.join(LIST_SEP),
            acmdline: cmdlines.join(LIST_SEP),
            apid: pids.join(LIST_SEP),
            parent,
        }
    }
}

fn cmdline(p: &ProcessSnapshot) -> String {
    format!("{} {}", p.exe, p.exe_args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgate_core::table::ProcessStore;

    fn snapshot(hpid: i64, exe: &str, poid: Option<Oid>) -> ProcessSnapshot {
        ProcessSnapshot {
            oid: Oid::new(hpid, hpid * 10),
            poid,
            exe: exe.to_owned(),
            exe_args: format!("args-{hpid}"),
            uid: hpid,
            user_name: format!("user-{hpid}"),
            gid: hpid,
            group_name: format!("group-{hpid}"),
            tty: hpid % 2 == 1,
            entry: false,
        }
    }

    /// P1(/bin/bash) ← P2(/usr/bin/make) ← P3(/usr/bin/cc)
    fn chain_store() -> Arc<ProcessStore> {
        let store = Arc::new(ProcessStore::new());
        store.insert(snapshot(1, "/bin/bash", None));
        store.insert(snapshot(2, "/usr/bin/make", Some(Oid::new(1, 10))));
        store.insert(snapshot(3, "/usr/bin/cc", Some(Oid::new(2, 20))));
        store
    }

    #[test]
    fn ancestor_names_ordered_parent_to_root() {
        let cache = AncestryCache::new(chain_store(), 128);
        let v = cache.value(Oid::new(3, 30), CachedAttr::AName);
        assert_eq!(v, Value::Str("make,bash".to_owned()));
    }

    #[test]
    fn ancestor_pids_and_exes() {
        let cache = AncestryCache::new(chain_store(), 128);
        assert_eq!(
            cache.value(Oid::new(3, 30), CachedAttr::APid),
            Value::Str("2,1".to_owned())
        );
        assert_eq!(
            cache.value(Oid::new(3, 30), CachedAttr::AExe),
            Value::Str("/usr/bin/make,/bin/bash".to_owned())
        );
    }

    #[test]
    fn parent_attributes_snapshot() {
        let cache = AncestryCache::new(chain_store(), 128);
        let oid = Oid::new(3, 30);
        assert_eq!(
            cache.value(oid, CachedAttr::PName),
            Value::Str("make".to_owned())
        );
        assert_eq!(
            cache.value(oid, CachedAttr::PExe),
            Value::Str("/usr/bin/make".to_owned())
        );
        assert_eq!(
            cache.value(oid, CachedAttr::PCmdLine),
            Value::Str("/usr/bin/make args-2".to_owned())
        );
        assert_eq!(cache.value(oid, CachedAttr::PUid), Value::Int(2));
        assert_eq!(cache.value(oid, CachedAttr::PTty), Value::Bool(false));
    }

    #[test]
    fn root_process_has_empty_ancestry() {
        let cache = AncestryCache::new(chain_store(), 128);
        let oid = Oid::new(1, 10);
        assert_eq!(cache.value(oid, CachedAttr::AName), Value::Str(String::new()));
        assert_eq!(cache.value(oid, CachedAttr::PName), Value::Str(String::new()));
    }

    #[test]
    fn unknown_oid_falls_back_to_zero_values() {
        let cache = AncestryCache::new(chain_store(), 128);
        let oid = Oid::new(99, 990);
        assert_eq!(cache.value(oid, CachedAttr::AName), Value::Str(String::new()));
        assert_eq!(cache.value(oid, CachedAttr::PUid), Value::Int(0));
        assert_eq!(cache.value(oid, CachedAttr::PTty), Value::Bool(false));
    }

    #[test]
    fn zero_oid_does_not_touch_cache() {
        let cache = AncestryCache::new(chain_store(), 128);
        assert_eq!(cache.value(Oid::default(), CachedAttr::AName), Value::Str(String::new()));
        assert_eq!(cache.stats().hits(), 0);
        assert_eq!(cache.stats().misses(), 0);
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let cache = AncestryCache::new(chain_store(), 128);
        let oid = Oid::new(3, 30);
        let _ = cache.value(oid, CachedAttr::AName);
        assert_eq!(cache.stats().misses(), 1);
        let _ = cache.value(oid, CachedAttr::APid);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[test]
    fn broken_chain_stops_at_first_missing_parent() {
        let store = Arc::new(ProcessStore::new());
        // 부모 OID는 있으나 테이블에 등록되지 않은 경우
        store.insert(snapshot(5, "/usr/bin/orphaned", Some(Oid::new(4, 40))));
        let cache = AncestryCache::new(store, 128);
        assert_eq!(
            cache.value(Oid::new(5, 50), CachedAttr::AName),
            Value::Str(String::new())
        );
    }

    #[test]
    fn chain_is_capped_at_depth_limit() {
        let store = Arc::new(ProcessStore::new());
        // 0 ← 1 ← 2 ← ... ← 63 체인
        store.insert(snapshot(0, "/sbin/init", None));
        for hpid in 1..64 {
            store.insert(snapshot(
                hpid,
                &format!("/bin/p{hpid}"),
                Some(Oid::new(hpid - 1, (hpid - 1) * 10)),
            ));
        }
        let cache = AncestryCache::new(store, 256);
        let Value::Str(apid) = cache.value(Oid::new(63, 630), CachedAttr::APid) else {
            panic!("apid must be a string");
        };
        assert_eq!(apid.split(',').count(), MAX_ANCESTRY_DEPTH);
    }

    #[test]
    fn capacity_is_bounded_by_generation_rotation() {
        let store = Arc::new(ProcessStore::new());
        for hpid in 0..100 {
            store.insert(snapshot(hpid, &format!("/bin/p{hpid}"), None));
        }
        let cache = AncestryCache::new(store, 16);
        for hpid in 0..100 {
            let _ = cache.value(Oid::new(hpid, hpid * 10), CachedAttr::AName);
        }
        assert!(cache.len() <= 16);
    }
}
