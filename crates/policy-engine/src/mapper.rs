//! 속성 매퍼 — 플랫 레코드를 정책 언어의 이름 붙은 속성으로 투영
//!
//! 매퍼는 `{종류, 소스, 슬롯}` 태그 유니온으로 표현되고 평가 시점의
//! `match` 한 번으로 해석됩니다. 테이블은 `sf.*` 네임스페이스와 Falco
//! 호환 별칭(`proc.*`, `fd.*`, `container.*`, `evt.*`, `user.*`,
//! `group.*`)을 같은 슬롯 접근자로 매핑합니다.
//!
//! 테이블에 없는 속성 이름은 이름 자체를 돌려주는 항등 문자열 매퍼로
//! 동작하며, 이름당 한 번 경고를 남깁니다.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, OnceLock};

use xxhash_rust::xxh64::Xxh64;

use flowgate_core::flags;
use flowgate_core::record::FlatRecord;
use flowgate_core::schema::{IntSlot, RecordKind, Source, StrSlot, UNKNOWN_TYPE_SYMBOL};

use crate::cache::{AncestryCache, CachedAttr};

/// 리스트 값 결합 구분자 (`sf.net.ip` 등)
pub const LIST_SEP: &str = ",";
/// cmdline 결합 구분자
const SPACE: &str = " ";

/// 매퍼가 만들어내는 값
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
}

/// 매퍼의 정적 타입 — 컴파일 시 비교 변형 선택에 사용
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Str,
    Bool,
}

/// 속성 매퍼 태그 유니온
#[derive(Debug, Clone)]
pub enum Mapper {
    /// int 슬롯 직접 읽기
    Int(Source, IntSlot),
    /// string 슬롯 직접 읽기
    Str(Source, StrSlot),
    /// int 슬롯을 불리언으로 (1 == true)
    Flag(Source, IntSlot),
    /// 레코드 타입 심볼 (PE, FE, FF, NF, ...)
    RecType(Source),
    /// 연산 플래그 심볼 결합 (레코드 타입 의존)
    OpFlags(Source),
    /// 시스템 콜 계열 이벤트 이름 결합 (레코드 타입 의존)
    EvtType(Source),
    /// 레코드 타입별 타임스탬프
    Ts(Source),
    /// 레코드 타입별 스레드 ID
    Tid(Source),
    /// 레코드 타입별 반환 값 (이벤트 전용)
    Ret(Source),
    /// 레코드 타입별 종료 타임스탬프 (플로우 전용)
    EndTs(Source),
    /// 경로의 basename
    Name(Source, StrSlot),
    /// 심볼릭 링크 파싱 후 실제 경로
    Path(Source, StrSlot),
    /// 심볼릭 링크 파싱 후 링크 경로
    Symlink(Source, StrSlot),
    /// 경로의 디렉토리
    Dir(Source, StrSlot),
    /// 파일 리소스 타입 문자
    FileType(Source, IntSlot),
    /// 읽기 모드 오픈 여부
    IsOpenRead(Source, IntSlot),
    /// 쓰기 모드 오픈 여부
    IsOpenWrite(Source, IntSlot),
    /// open 플래그 심볼 결합
    OpenFlags(Source, IntSlot),
    /// L4 프로토콜 이름
    Proto(Source, IntSlot),
    /// 포트 슬롯들을 십진 문자열로 결합
    Port(Source, &'static [IntSlot]),
    /// IP 슬롯들을 점분리 표기로 결합
    Ip(Source, &'static [IntSlot]),
    /// int 슬롯 합계
    Sum(Source, &'static [IntSlot]),
    /// string 슬롯 공백 결합 (cmdline)
    Join(Source, &'static [StrSlot]),
    /// 이미지 이름의 저장소 부분 (':' 앞)
    Repo(Source, StrSlot),
    /// 컨테이너 타입 이름
    ContType(Source, IntSlot),
    /// OID 해시 (xxh64 16진 인코딩)
    OidHash(Source, IntSlot, IntSlot),
    /// 조상 캐시 파생 속성
    Cached(CachedAttr),
    /// 상수 문자열
    Consts(&'static str),
    /// 알 수 없는 속성의 항등 매퍼 — 속성 이름 자체를 반환
    Identity(String),
}

impl Mapper {
    /// 매퍼의 정적 값 타입
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(..)
            | Self::Ts(_)
            | Self::Tid(_)
            | Self::Ret(_)
            | Self::EndTs(_)
            | Self::Sum(..) => ValueKind::Int,
            Self::Flag(..) | Self::IsOpenRead(..) | Self::IsOpenWrite(..) => ValueKind::Bool,
            Self::Cached(attr) => attr.kind(),
            _ => ValueKind::Str,
        }
    }

    /// 레코드에서 속성 값을 평가합니다.
    pub fn eval(&self, r: &FlatRecord, cache: &AncestryCache) -> Value {
        match self {
            Self::Int(src, slot) => Value::Int(r.get_int(*src, *slot)),
            Self::Str(src, slot) => Value::Str(r.get_str(*src, *slot).to_owned()),
            Self::Flag(src, slot) => Value::Bool(r.get_int(*src, *slot) == 1),
            Self::RecType(src) => Value::Str(rec_type_symbol(r, *src).to_owned()),
            Self::OpFlags(src) => {
                let flags_value = op_flags_of(r, *src);
                let names = flags::op_flag_names(flags_value, kind_of(r, *src));
                Value::Str(names.join(LIST_SEP))
            }
            Self::EvtType(src) => {
                let flags_value = op_flags_of(r, *src);
                let names = flags::evt_type_names(flags_value, kind_of(r, *src));
                Value::Str(names.join(LIST_SEP))
            }
            Self::Ts(src) => Value::Int(match kind_of(r, *src) {
                Some(RecordKind::ProcEvt) => r.get_int(*src, IntSlot::EvProcTs),
                Some(RecordKind::FileEvt) => r.get_int(*src, IntSlot::EvFileTs),
                Some(RecordKind::FileFlow) => r.get_int(*src, IntSlot::FlowFileTs),
                Some(RecordKind::NetFlow) => r.get_int(*src, IntSlot::FlowNetTs),
                _ => 0,
            }),
            Self::Tid(src) => Value::Int(match kind_of(r, *src) {
                Some(RecordKind::ProcEvt) => r.get_int(*src, IntSlot::EvProcTid),
                Some(RecordKind::FileEvt) => r.get_int(*src, IntSlot::EvFileTid),
                Some(RecordKind::FileFlow) => r.get_int(*src, IntSlot::FlowFileTid),
                Some(RecordKind::NetFlow) => r.get_int(*src, IntSlot::FlowNetTid),
                _ => 0,
            }),
            Self::Ret(src) => Value::Int(match kind_of(r, *src) {
                Some(RecordKind::ProcEvt) => r.get_int(*src, IntSlot::EvProcRet),
                Some(RecordKind::FileEvt) => r.get_int(*src, IntSlot::EvFileRet),
                _ => 0,
            }),
            Self::EndTs(src) => Value::Int(match kind_of(r, *src) {
                Some(RecordKind::FileFlow) => r.get_int(*src, IntSlot::FlowFileEndTs),
                Some(RecordKind::NetFlow) => r.get_int(*src, IntSlot::FlowNetEndTs),
                _ => 0,
            }),
            Self::Name(src, slot) => Value::Str(basename(r.get_str(*src, *slot)).to_owned()),
            Self::Path(src, slot) => {
                let (path, _) = parse_sym_path(r.get_str(*src, *slot));
                Value::Str(path.to_owned())
            }
            Self::Symlink(src, slot) => {
                let (_, link) = parse_sym_path(r.get_str(*src, *slot));
                Value::Str(link.to_owned())
            }
            Self::Dir(src, slot) => {
                let (path, _) = parse_sym_path(r.get_str(*src, *slot));
                Value::Str(dirname(path).to_owned())
            }
            Self::FileType(src, slot) => {
                Value::Str(flags::file_type_char(r.get_int(*src, *slot)).to_string())
            }
            Self::IsOpenRead(src, slot) => Value::Bool(flags::is_open_read(r.get_int(*src, *slot))),
            Self::IsOpenWrite(src, slot) => {
                Value::Bool(flags::is_open_write(r.get_int(*src, *slot)))
            }
            Self::OpenFlags(src, slot) => {
                Value::Str(flags::open_flag_names(r.get_int(*src, *slot)).join(LIST_SEP))
            }
            Self::Proto(src, slot) => {
                Value::Str(flags::proto_name(r.get_int(*src, *slot)).to_owned())
            }
            Self::Port(src, slots) => Value::Str(
                slots
                    .iter()
                    .map(|s| r.get_int(*src, *s).to_string())
                    .collect::<Vec<_>>()
                    .join(LIST_SEP),
            ),
            Self::Ip(src, slots) => Value::Str(
                slots
                    .iter()
                    .map(|s| flags::ipv4_str(r.get_int(*src, *s)))
                    .collect::<Vec<_>>()
                    .join(LIST_SEP),
            ),
            Self::Sum(src, slots) => {
                Value::Int(slots.iter().map(|s| r.get_int(*src, *s)).sum())
            }
            Self::Join(src, slots) => Value::Str(
                slots
                    .iter()
                    .map(|s| r.get_str(*src, *s))
                    .collect::<Vec<_>>()
                    .join(SPACE),
            ),
            Self::Repo(src, slot) => Value::Str(
                r.get_str(*src, *slot)
                    .split(':')
                    .next()
                    .unwrap_or_default()
                    .to_owned(),
            ),
            Self::ContType(src, slot) => {
                Value::Str(flags::container_type_name(r.get_int(*src, *slot)).to_owned())
            }
            Self::OidHash(src, hpid, create_ts) => {
                let mut h = Xxh64::new(0);
                h.update(r.get_int(*src, *hpid).to_string().as_bytes());
                h.update(r.get_int(*src, *create_ts).to_string().as_bytes());
                Value::Str(format!("{:016x}", h.digest()))
            }
            Self::Cached(attr) => cache.value(r.subject_oid(), *attr),
            Self::Consts(text) => Value::Str((*text).to_owned()),
            Self::Identity(name) => Value::Str(name.clone()),
        }
    }
}

fn kind_of(r: &FlatRecord, src: Source) -> Option<RecordKind> {
    RecordKind::from_code(r.get_int(src, IntSlot::RecType))
}

fn rec_type_symbol(r: &FlatRecord, src: Source) -> &'static str {
    kind_of(r, src).map_or(UNKNOWN_TYPE_SYMBOL, RecordKind::symbol)
}

fn op_flags_of(r: &FlatRecord, src: Source) -> i64 {
    match kind_of(r, src) {
        Some(RecordKind::ProcEvt) => r.get_int(src, IntSlot::EvProcOpFlags),
        Some(RecordKind::FileEvt) => r.get_int(src, IntSlot::EvFileOpFlags),
        Some(RecordKind::FileFlow) => r.get_int(src, IntSlot::FlowFileOpFlags),
        Some(RecordKind::NetFlow) => r.get_int(src, IntSlot::FlowNetOpFlags),
        _ => 0,
    }
}

/// 경로의 basename. 빈 경로는 빈 문자열을 돌려줍니다.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// 경로의 디렉토리 부분
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// `"실제경로 -> 링크경로"` 인코딩을 분해합니다.
pub fn parse_sym_path(raw: &str) -> (&str, &str) {
    match raw.split_once(" -> ") {
        Some((path, link)) => (path.trim(), link.trim()),
        None => (raw, ""),
    }
}

/// 리터럴 양끝의 따옴표를 제거합니다.
pub fn trim_bounding_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// 속성 이름으로 매퍼를 찾습니다.
pub fn lookup(attr: &str) -> Option<&'static Mapper> {
    mappers().get(attr)
}

/// 알 수 없는 속성의 항등 매퍼를 만듭니다. 이름당 한 번 경고합니다.
pub fn identity(attr: &str) -> Mapper {
    static WARNED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    let warned = WARNED.get_or_init(|| Mutex::new(HashSet::new()));
    let mut guard = warned.lock().unwrap_or_else(|e| e.into_inner());
    if guard.insert(attr.to_owned()) {
        tracing::warn!(attr, "unknown attribute, treating as identity string mapper");
    }
    Mapper::Identity(attr.to_owned())
}

/// 테이블에 등록된 모든 속성 이름 (정렬됨)
pub fn attribute_names() -> Vec<&'static str> {
    let mut names: Vec<_> = mappers().keys().copied().collect();
    names.sort_unstable();
    names
}

fn mappers() -> &'static HashMap<&'static str, Mapper> {
    static MAPPERS: OnceLock<HashMap<&'static str, Mapper>> = OnceLock::new();
    MAPPERS.get_or_init(build_table)
}

#[rustfmt::skip]
fn build_table() -> HashMap<&'static str, Mapper> {
    use IntSlot as I;
    use StrSlot as S;
    const SF: Source = Source::SysFlow;

    let mut t: HashMap<&'static str, Mapper> = HashMap::new();

    // --- sf.* 네임스페이스 ---
    t.insert("sf.type",                  Mapper::RecType(SF));
    t.insert("sf.opflags",               Mapper::OpFlags(SF));
    t.insert("sf.ret",                   Mapper::Ret(SF));
    t.insert("sf.ts",                    Mapper::Ts(SF));
    t.insert("sf.endts",                 Mapper::EndTs(SF));
    t.insert("sf.proc.oid",              Mapper::OidHash(SF, I::ProcOidHpid, I::ProcOidCreateTs));
    t.insert("sf.proc.pid",              Mapper::Int(SF, I::ProcOidHpid));
    t.insert("sf.proc.tid",              Mapper::Tid(SF));
    t.insert("sf.proc.name",             Mapper::Name(SF, S::ProcExe));
    t.insert("sf.proc.exe",              Mapper::Str(SF, S::ProcExe));
    t.insert("sf.proc.args",             Mapper::Str(SF, S::ProcExeArgs));
    t.insert("sf.proc.uid",              Mapper::Int(SF, I::ProcUid));
    t.insert("sf.proc.user",             Mapper::Str(SF, S::ProcUserName));
    t.insert("sf.proc.gid",              Mapper::Int(SF, I::ProcGid));
    t.insert("sf.proc.group",            Mapper::Str(SF, S::ProcGroupName));
    t.insert("sf.proc.createts",         Mapper::Int(SF, I::ProcOidCreateTs));
    t.insert("sf.proc.tty",              Mapper::Int(SF, I::ProcTty));
    t.insert("sf.proc.entry",            Mapper::Flag(SF, I::ProcEntry));
    t.insert("sf.proc.cmdline",          Mapper::Join(SF, &[S::ProcExe, S::ProcExeArgs]));
    t.insert("sf.proc.aname",            Mapper::Cached(CachedAttr::AName));
    t.insert("sf.proc.aexe",             Mapper::Cached(CachedAttr::AExe));
    t.insert("sf.proc.acmdline",         Mapper::Cached(CachedAttr::ACmdLine));
    t.insert("sf.proc.apid",             Mapper::Cached(CachedAttr::APid));
    t.insert("sf.pproc.oid",             Mapper::OidHash(SF, I::ProcPoidHpid, I::ProcPoidCreateTs));
    t.insert("sf.pproc.pid",             Mapper::Int(SF, I::ProcPoidHpid));
    t.insert("sf.pproc.name",            Mapper::Cached(CachedAttr::PName));
    t.insert("sf.pproc.exe",             Mapper::Cached(CachedAttr::PExe));
    t.insert("sf.pproc.args",            Mapper::Cached(CachedAttr::PArgs));
    t.insert("sf.pproc.uid",             Mapper::Cached(CachedAttr::PUid));
    t.insert("sf.pproc.user",            Mapper::Cached(CachedAttr::PUser));
    t.insert("sf.pproc.gid",             Mapper::Cached(CachedAttr::PGid));
    t.insert("sf.pproc.group",           Mapper::Cached(CachedAttr::PGroup));
    t.insert("sf.pproc.createts",        Mapper::Int(SF, I::ProcPoidCreateTs));
    t.insert("sf.pproc.tty",             Mapper::Cached(CachedAttr::PTty));
    t.insert("sf.pproc.entry",           Mapper::Cached(CachedAttr::PEntry));
    t.insert("sf.pproc.cmdline",         Mapper::Cached(CachedAttr::PCmdLine));
    t.insert("sf.file.name",             Mapper::Name(SF, S::FilePath));
    t.insert("sf.file.path",             Mapper::Path(SF, S::FilePath));
    t.insert("sf.file.symlink",          Mapper::Symlink(SF, S::FilePath));
    t.insert("sf.file.oid",              Mapper::Str(SF, S::FileOid));
    t.insert("sf.file.directory",        Mapper::Dir(SF, S::FilePath));
    t.insert("sf.file.newname",          Mapper::Name(SF, S::SecFilePath));
    t.insert("sf.file.newpath",          Mapper::Path(SF, S::SecFilePath));
    t.insert("sf.file.newsymlink",       Mapper::Symlink(SF, S::SecFilePath));
    t.insert("sf.file.newoid",           Mapper::Str(SF, S::SecFileOid));
    t.insert("sf.file.newdirectory",     Mapper::Dir(SF, S::SecFilePath));
    t.insert("sf.file.type",             Mapper::FileType(SF, I::FileRestype));
    t.insert("sf.file.is_open_write",    Mapper::IsOpenWrite(SF, I::FlowFileOpenFlags));
    t.insert("sf.file.is_open_read",     Mapper::IsOpenRead(SF, I::FlowFileOpenFlags));
    t.insert("sf.file.fd",               Mapper::Int(SF, I::FlowFileFd));
    t.insert("sf.file.openflags",        Mapper::OpenFlags(SF, I::FlowFileOpenFlags));
    t.insert("sf.net.proto",             Mapper::Int(SF, I::FlowNetProto));
    t.insert("sf.net.sport",             Mapper::Int(SF, I::FlowNetSport));
    t.insert("sf.net.dport",             Mapper::Int(SF, I::FlowNetDport));
    t.insert("sf.net.port",              Mapper::Port(SF, &[I::FlowNetSport, I::FlowNetDport]));
    t.insert("sf.net.sip",               Mapper::Ip(SF, &[I::FlowNetSip]));
    t.insert("sf.net.dip",               Mapper::Ip(SF, &[I::FlowNetDip]));
    t.insert("sf.net.ip",                Mapper::Ip(SF, &[I::FlowNetSip, I::FlowNetDip]));
    t.insert("sf.flow.rbytes",           Mapper::Sum(SF, &[I::FlowFileRecvBytes, I::FlowNetRecvBytes]));
    t.insert("sf.flow.rops",             Mapper::Sum(SF, &[I::FlowFileRecvOps, I::FlowNetRecvOps]));
    t.insert("sf.flow.wbytes",           Mapper::Sum(SF, &[I::FlowFileSendBytes, I::FlowNetSendBytes]));
    t.insert("sf.flow.wops",             Mapper::Sum(SF, &[I::FlowFileSendOps, I::FlowNetSendOps]));
    t.insert("sf.container.id",          Mapper::Str(SF, S::ContId));
    t.insert("sf.container.name",        Mapper::Str(SF, S::ContName));
    t.insert("sf.container.imageid",     Mapper::Str(SF, S::ContImageId));
    t.insert("sf.container.image",       Mapper::Str(SF, S::ContImage));
    t.insert("sf.container.type",        Mapper::ContType(SF, I::ContType));
    t.insert("sf.container.privileged",  Mapper::Int(SF, I::ContPrivileged));
    t.insert("sf.node.id",               Mapper::Str(SF, S::HdrExporter));
    t.insert("sf.node.ip",               Mapper::Str(SF, S::HdrIp));
    t.insert("sf.schema.version",        Mapper::Int(SF, I::HdrVersion));

    // --- Falco 호환 별칭 ---
    t.insert("evt.type",                 Mapper::EvtType(SF));
    t.insert("evt.rawres",               Mapper::RecType(SF));
    t.insert("evt.rawtime",              Mapper::Ts(SF));
    t.insert("evt.dir",                  Mapper::Consts("<,>"));
    t.insert("evt.is_open_read",         Mapper::IsOpenRead(SF, I::FlowFileOpenFlags));
    t.insert("evt.is_open_write",        Mapper::IsOpenWrite(SF, I::FlowFileOpenFlags));
    t.insert("fd.typechar",              Mapper::FileType(SF, I::FileRestype));
    t.insert("fd.directory",             Mapper::Dir(SF, S::FilePath));
    t.insert("fd.name",                  Mapper::Name(SF, S::FilePath));
    t.insert("fd.filename",              Mapper::Name(SF, S::FilePath));
    t.insert("fd.proto",                 Mapper::Proto(SF, I::FlowNetProto));
    t.insert("fd.lproto",                Mapper::Proto(SF, I::FlowNetProto));
    t.insert("fd.l4proto",               Mapper::Proto(SF, I::FlowNetProto));
    t.insert("fd.rproto",                Mapper::Proto(SF, I::FlowNetProto));
    t.insert("fd.sproto",                Mapper::Proto(SF, I::FlowNetProto));
    t.insert("fd.cproto",                Mapper::Proto(SF, I::FlowNetProto));
    t.insert("fd.sport",                 Mapper::Int(SF, I::FlowNetSport));
    t.insert("fd.dport",                 Mapper::Int(SF, I::FlowNetDport));
    t.insert("fd.sip",                   Mapper::Ip(SF, &[I::FlowNetSip]));
    t.insert("fd.dip",                   Mapper::Ip(SF, &[I::FlowNetDip]));
    t.insert("fd.ip",                    Mapper::Ip(SF, &[I::FlowNetSip, I::FlowNetDip]));
    t.insert("fd.port",                  Mapper::Port(SF, &[I::FlowNetSport, I::FlowNetDport]));
    t.insert("fd.num",                   Mapper::Int(SF, I::FlowFileFd));
    t.insert("user.name",                Mapper::Str(SF, S::ProcUserName));
    t.insert("group.name",               Mapper::Str(SF, S::ProcGroupName));
    t.insert("proc.pid",                 Mapper::Int(SF, I::ProcOidHpid));
    t.insert("proc.tid",                 Mapper::Tid(SF));
    t.insert("proc.uid",                 Mapper::Int(SF, I::ProcUid));
    t.insert("proc.gid",                 Mapper::Int(SF, I::ProcGid));
    t.insert("proc.user",                Mapper::Str(SF, S::ProcUserName));
    t.insert("proc.group",               Mapper::Str(SF, S::ProcGroupName));
    t.insert("proc.tty",                 Mapper::Int(SF, I::ProcTty));
    t.insert("proc.exe",                 Mapper::Str(SF, S::ProcExe));
    t.insert("proc.name",                Mapper::Name(SF, S::ProcExe));
    t.insert("proc.args",                Mapper::Str(SF, S::ProcExeArgs));
    t.insert("proc.cmdline",             Mapper::Join(SF, &[S::ProcExe, S::ProcExeArgs]));
    t.insert("proc.createtime",          Mapper::Int(SF, I::ProcOidCreateTs));
    t.insert("proc.aname",               Mapper::Cached(CachedAttr::AName));
    t.insert("proc.apid",                Mapper::Cached(CachedAttr::APid));
    t.insert("proc.ppid",                Mapper::Int(SF, I::ProcPoidHpid));
    t.insert("proc.pname",               Mapper::Cached(CachedAttr::PName));
    t.insert("proc.pexe",                Mapper::Cached(CachedAttr::PExe));
    t.insert("proc.pargs",               Mapper::Cached(CachedAttr::PArgs));
    t.insert("proc.pcmdline",            Mapper::Cached(CachedAttr::PCmdLine));
    t.insert("proc.puid",                Mapper::Cached(CachedAttr::PUid));
    t.insert("proc.puser",               Mapper::Cached(CachedAttr::PUser));
    t.insert("proc.pgid",                Mapper::Cached(CachedAttr::PGid));
    t.insert("proc.pgroup",              Mapper::Cached(CachedAttr::PGroup));
    t.insert("proc.ptty",                Mapper::Cached(CachedAttr::PTty));
    t.insert("container.id",             Mapper::Str(SF, S::ContId));
    t.insert("container.name",           Mapper::Str(SF, S::ContName));
    t.insert("container.image",          Mapper::Str(SF, S::ContImage));
    t.insert("container.image.id",       Mapper::Str(SF, S::ContImageId));
    t.insert("container.image.repository", Mapper::Repo(SF, S::ContImage));
    t.insert("container.type",           Mapper::ContType(SF, I::ContType));
    t.insert("container.privileged",     Mapper::Int(SF, I::ContPrivileged));

    t
}
