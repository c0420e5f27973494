//! 프로세스 테이블 — OID로 조회하는 프로세스 스냅샷 저장소
//!
//! 조상 체인 해석은 부모 OID를 따라가며 이 테이블을 조회합니다.
//! 업스트림 수집기(또는 플래트너)가 스트림에서 관측한 프로세스 엔티티를
//! 기록하고, 정책 엔진의 조상 캐시가 읽습니다.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::raw::Process;
use crate::record::Oid;

/// 테이블에 보관되는 프로세스 속성 스냅샷
///
/// 프로세스가 처음 관측된 시점의 속성입니다.
#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    pub oid: Oid,
    pub poid: Option<Oid>,
    pub exe: String,
    pub exe_args: String,
    pub uid: i64,
    pub user_name: String,
    pub gid: i64,
    pub group_name: String,
    pub tty: bool,
    pub entry: bool,
}

impl From<&Process> for ProcessSnapshot {
    fn from(p: &Process) -> Self {
        Self {
            oid: p.oid,
            poid: p.poid,
            exe: p.exe.clone(),
            exe_args: p.exe_args.clone(),
            uid: p.uid,
            user_name: p.user_name.clone(),
            gid: p.gid,
            group_name: p.group_name.clone(),
            tty: p.tty,
            entry: p.entry,
        }
    }
}

/// OID로 프로세스 스냅샷을 조회하는 인터페이스
///
/// 조상 캐시가 의존하는 유일한 읽기 연산입니다. 명시적 의존성으로
/// 전달되며 전역 상태를 두지 않습니다.
pub trait ProcessTable: Send + Sync {
    /// OID에 해당하는 스냅샷을 반환합니다. 없으면 `None`.
    fn get(&self, oid: &Oid) -> Option<ProcessSnapshot>;
}

/// 인메모리 프로세스 테이블
///
/// 읽기가 압도적으로 많으므로 reader-writer 락으로 보호합니다.
#[derive(Default)]
pub struct ProcessStore {
    inner: RwLock<HashMap<Oid, ProcessSnapshot>>,
}

impl ProcessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 스냅샷을 기록합니다. 같은 OID는 최신 관측으로 덮어씁니다.
    pub fn insert(&self, snapshot: ProcessSnapshot) {
        self.inner.write().insert(snapshot.oid, snapshot);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl ProcessTable for ProcessStore {
    fn get(&self, oid: &Oid) -> Option<ProcessSnapshot> {
        self.inner.read().get(oid).cloned()
    }
}
