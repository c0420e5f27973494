//! 플랫 레코드 — 컬럼형 텔레메트리 레코드
//!
//! 하나의 관측 이벤트(플로우/이벤트)를 소스별 int64/string 배열 쌍으로
//! 표현합니다. 모든 슬롯은 생성 시점에 0 값으로 초기화되며, 속성 접근은
//! 슬롯 인덱스를 통한 O(1) 배열 접근입니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{IntSlot, RecordKind, Source, StrSlot};

/// 프로세스 인스턴스 식별자 — `(host_pid, create_ts_ns)` 16바이트
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Oid {
    /// 호스트 PID
    pub hpid: i64,
    /// 생성 시각 (ns)
    pub create_ts: i64,
}

impl Oid {
    pub fn new(hpid: i64, create_ts: i64) -> Self {
        Self { hpid, create_ts }
    }

    /// 두 필드가 모두 0이면 "없음"으로 취급합니다.
    pub fn is_zero(&self) -> bool {
        self.hpid == 0 && self.create_ts == 0
    }

    /// 16바이트 직렬 표현 (hpid, create_ts 리틀 엔디언)
    pub fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.hpid.to_le_bytes());
        out[8..].copy_from_slice(&self.create_ts.to_le_bytes());
        out
    }

    /// 16바이트 직렬 표현에서 복원합니다.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut hpid = [0u8; 8];
        let mut create_ts = [0u8; 8];
        hpid.copy_from_slice(&bytes[..8]);
        create_ts.copy_from_slice(&bytes[8..]);
        Self {
            hpid: i64::from_le_bytes(hpid),
            create_ts: i64::from_le_bytes(create_ts),
        }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hpid, self.create_ts)
    }
}

/// 컬럼형 플랫 레코드
///
/// `sources[i]`가 식별하는 컬럼 패밀리의 값이 `ints[i]` / `strs[i]`에
/// 담깁니다. 배열 길이는 항상 스키마 선언 길이와 일치합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    /// 소스 태그 (컬럼 패밀리 식별)
    pub sources: Vec<Source>,
    /// int64 슬롯 배열, `[source][slot]`
    pub ints: Vec<Vec<i64>>,
    /// string 슬롯 배열, `[source][slot]`
    pub strs: Vec<Vec<String>>,
}

impl FlatRecord {
    /// SysFlow 소스 하나를 가진 레코드를 0 값으로 초기화해 생성합니다.
    pub fn new() -> Self {
        Self::with_sources(&[Source::SysFlow])
    }

    /// 주어진 소스 패밀리를 가진 레코드를 0 값으로 초기화해 생성합니다.
    pub fn with_sources(sources: &[Source]) -> Self {
        Self {
            sources: sources.to_vec(),
            ints: sources.iter().map(|_| vec![0; IntSlot::COUNT]).collect(),
            strs: sources
                .iter()
                .map(|_| vec![String::new(); StrSlot::COUNT])
                .collect(),
        }
    }

    fn source_index(&self, src: Source) -> Option<usize> {
        self.sources.iter().position(|s| *s == src)
    }

    /// int 슬롯을 읽습니다. 소스 패밀리가 없으면 0을 반환합니다.
    #[inline]
    pub fn get_int(&self, src: Source, slot: IntSlot) -> i64 {
        match self.source_index(src) {
            Some(i) => self.ints[i][slot.idx()],
            None => 0,
        }
    }

    /// string 슬롯을 읽습니다. 소스 패밀리가 없으면 빈 문자열을 반환합니다.
    #[inline]
    pub fn get_str(&self, src: Source, slot: StrSlot) -> &str {
        match self.source_index(src) {
            Some(i) => self.strs[i][slot.idx()].as_str(),
            None => "",
        }
    }

    /// int 슬롯에 값을 기록합니다. 소스 패밀리가 없으면 무시됩니다.
    #[inline]
    pub fn set_int(&mut self, src: Source, slot: IntSlot, value: i64) {
        if let Some(i) = self.source_index(src) {
            self.ints[i][slot.idx()] = value;
        }
    }

    /// string 슬롯에 값을 기록합니다. 소스 패밀리가 없으면 무시됩니다.
    #[inline]
    pub fn set_str(&mut self, src: Source, slot: StrSlot, value: impl Into<String>) {
        if let Some(i) = self.source_index(src) {
            self.strs[i][slot.idx()] = value.into();
        }
    }

    /// 레코드 종류 (`RecType` 슬롯)
    pub fn kind(&self) -> Option<RecordKind> {
        RecordKind::from_code(self.get_int(Source::SysFlow, IntSlot::RecType))
    }

    /// 주체 프로세스 OID
    pub fn subject_oid(&self) -> Oid {
        Oid::new(
            self.get_int(Source::SysFlow, IntSlot::ProcOidHpid),
            self.get_int(Source::SysFlow, IntSlot::ProcOidCreateTs),
        )
    }

    /// 부모 프로세스 OID. 기록되지 않았으면 `None`.
    pub fn parent_oid(&self) -> Option<Oid> {
        let oid = Oid::new(
            self.get_int(Source::SysFlow, IntSlot::ProcPoidHpid),
            self.get_int(Source::SysFlow, IntSlot::ProcPoidCreateTs),
        );
        (!oid.is_zero()).then_some(oid)
    }
}

impl Default for FlatRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_zero_filled() {
        let rec = FlatRecord::new();
        assert_eq!(rec.sources, vec![Source::SysFlow]);
        assert_eq!(rec.ints[0].len(), IntSlot::COUNT);
        assert_eq!(rec.strs[0].len(), StrSlot::COUNT);
        assert!(rec.ints[0].iter().all(|v| *v == 0));
        assert!(rec.strs[0].iter().all(|s| s.is_empty()));
    }

    #[test]
    fn get_set_roundtrip() {
        let mut rec = FlatRecord::new();
        rec.set_int(Source::SysFlow, IntSlot::FlowNetSport, 12345);
        rec.set_str(Source::SysFlow, StrSlot::ProcExe, "/usr/bin/apt");
        assert_eq!(rec.get_int(Source::SysFlow, IntSlot::FlowNetSport), 12345);
        assert_eq!(rec.get_str(Source::SysFlow, StrSlot::ProcExe), "/usr/bin/apt");
    }

    #[test]
    fn absent_source_reads_zero_values() {
        let rec = FlatRecord::new();
        assert_eq!(rec.get_int(Source::NetworkExt, IntSlot::FlowNetSport), 0);
        assert_eq!(rec.get_str(Source::ProcessExt, StrSlot::ProcExe), "");
    }

    #[test]
    fn writes_to_absent_source_are_ignored() {
        let mut rec = FlatRecord::new();
        rec.set_int(Source::FileExt, IntSlot::FileTs, 7);
        assert_eq!(rec.get_int(Source::FileExt, IntSlot::FileTs), 0);
    }

    #[test]
    fn kind_reads_rec_type_slot() {
        let mut rec = FlatRecord::new();
        assert_eq!(rec.kind(), Some(RecordKind::Header));
        rec.set_int(Source::SysFlow, IntSlot::RecType, RecordKind::NetFlow.code());
        assert_eq!(rec.kind(), Some(RecordKind::NetFlow));
    }

    #[test]
    fn subject_and_parent_oid() {
        let mut rec = FlatRecord::new();
        rec.set_int(Source::SysFlow, IntSlot::ProcOidHpid, 100);
        rec.set_int(Source::SysFlow, IntSlot::ProcOidCreateTs, 999);
        assert_eq!(rec.subject_oid(), Oid::new(100, 999));
        assert_eq!(rec.parent_oid(), None);

        rec.set_int(Source::SysFlow, IntSlot::ProcPoidHpid, 1);
        assert_eq!(rec.parent_oid(), Some(Oid::new(1, 0)));
    }

    #[test]
    fn oid_zero_check() {
        assert!(Oid::default().is_zero());
        assert!(!Oid::new(1, 0).is_zero());
    }

    #[test]
    fn oid_byte_roundtrip_is_identity() {
        for oid in [
            Oid::default(),
            Oid::new(4242, 1_700_000_000_000_000_000),
            Oid::new(i64::MAX, i64::MIN),
        ] {
            assert_eq!(Oid::from_bytes(oid.to_bytes()), oid);
        }
    }

    #[test]
    fn record_clone_is_identical() {
        let mut rec = FlatRecord::new();
        rec.set_str(Source::SysFlow, StrSlot::ContName, "web");
        rec.set_int(Source::SysFlow, IntSlot::FlowNetDport, 443);
        let copy = rec.clone();
        assert_eq!(rec, copy);
    }

    #[test]
    fn record_serializes_to_json() {
        let rec = FlatRecord::new();
        let json = serde_json::to_string(&rec).unwrap();
        let back: FlatRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }
}
