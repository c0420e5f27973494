//! 계층형 레코드 → 플랫 레코드 투영
//!
//! 관측 페이로드당 하나의 [`FlatRecord`]를 만들고, 동반 엔티티의 값을
//! 선언된 슬롯에 복사합니다. 레코드는 생성 시점에 0 값으로 초기화되므로
//! 누락 엔티티는 별도 처리 없이 0 채움이 보장됩니다.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use flowgate_core::raw::{
    Container, EventPayload, FileEntity, FileEvent, FileFlow, Header, NetworkFlow, Process,
    ProcessEvent, RawRecord,
};
use flowgate_core::record::FlatRecord;
use flowgate_core::schema::{IntSlot, RecordKind, Source, StrSlot};
use flowgate_core::table::{ProcessSnapshot, ProcessStore};

/// 플래트너 스테이지 통계
#[derive(Debug, Default)]
pub struct FlattenerStats {
    /// 수신한 계층형 레코드 수
    pub records_in: AtomicU64,
    /// 출력한 플랫 레코드 수
    pub records_out: AtomicU64,
}

impl FlattenerStats {
    pub fn records_in(&self) -> u64 {
        self.records_in.load(Ordering::Relaxed)
    }

    pub fn records_out(&self) -> u64 {
        self.records_out.load(Ordering::Relaxed)
    }
}

/// 플래트너 스테이지
///
/// 프로세스 테이블은 명시적 의존성으로 주입됩니다. 스트림에서 관측한
/// 모든 프로세스 엔티티를 테이블에 기록하여, 다운스트림의 조상 해석이
/// 부모 체인을 조회할 수 있게 합니다.
pub struct Flattener {
    store: Arc<ProcessStore>,
    stats: Arc<FlattenerStats>,
}

impl Flattener {
    pub fn new(store: Arc<ProcessStore>) -> Self {
        Self {
            store,
            stats: Arc::new(FlattenerStats::default()),
        }
    }

    /// 스테이지 통계 핸들
    pub fn stats(&self) -> Arc<FlattenerStats> {
        Arc::clone(&self.stats)
    }

    /// 계층형 레코드 하나를 투영합니다.
    ///
    /// 플로우/이벤트 페이로드면 `Some(FlatRecord)`, 단독 엔티티 레코드면
    /// `None`을 반환합니다. 어느 쪽이든 동반 프로세스 엔티티는 프로세스
    /// 테이블에 기록됩니다.
    pub fn flatten(&self, raw: &RawRecord) -> Option<FlatRecord> {
        if let Some(proc) = &raw.process {
            self.store.insert(ProcessSnapshot::from(proc));
        }

        match &raw.payload {
            EventPayload::NetFlow(nf) => Some(self.flatten_net_flow(raw, nf)),
            EventPayload::FileFlow(ff) => Some(self.flatten_file_flow(raw, ff)),
            EventPayload::FileEvent(fe) => Some(self.flatten_file_event(raw, fe)),
            EventPayload::ProcessEvent(pe) => Some(self.flatten_proc_event(raw, pe)),
            EventPayload::Entity => None,
        }
    }

    fn flatten_net_flow(&self, raw: &RawRecord, nf: &NetworkFlow) -> FlatRecord {
        let mut fr = FlatRecord::new();
        let src = Source::SysFlow;
        fr.set_int(src, IntSlot::RecType, RecordKind::NetFlow.code());
        // 네트워크 플로우에는 파일 엔티티가 없습니다
        self.fill_entities(&mut fr, raw, None);
        fr.set_int(src, IntSlot::FlowNetTs, nf.ts);
        fr.set_int(src, IntSlot::FlowNetTid, nf.tid);
        fr.set_int(src, IntSlot::FlowNetOpFlags, nf.op_flags);
        fr.set_int(src, IntSlot::FlowNetEndTs, nf.end_ts);
        fr.set_int(src, IntSlot::FlowNetSip, nf.sip);
        fr.set_int(src, IntSlot::FlowNetSport, nf.sport);
        fr.set_int(src, IntSlot::FlowNetDip, nf.dip);
        fr.set_int(src, IntSlot::FlowNetDport, nf.dport);
        fr.set_int(src, IntSlot::FlowNetProto, nf.proto);
        fr.set_int(src, IntSlot::FlowNetFd, nf.fd);
        fr.set_int(src, IntSlot::FlowNetRecvOps, nf.recv_ops);
        fr.set_int(src, IntSlot::FlowNetSendOps, nf.send_ops);
        fr.set_int(src, IntSlot::FlowNetRecvBytes, nf.recv_bytes);
        fr.set_int(src, IntSlot::FlowNetSendBytes, nf.send_bytes);
        fr
    }

    fn flatten_file_flow(&self, raw: &RawRecord, ff: &FileFlow) -> FlatRecord {
        let mut fr = FlatRecord::new();
        let src = Source::SysFlow;
        fr.set_int(src, IntSlot::RecType, RecordKind::FileFlow.code());
        self.fill_entities(&mut fr, raw, raw.file.as_ref());
        fr.set_int(src, IntSlot::FlowFileTs, ff.ts);
        fr.set_int(src, IntSlot::FlowFileTid, ff.tid);
        fr.set_int(src, IntSlot::FlowFileOpFlags, ff.op_flags);
        fr.set_int(src, IntSlot::FlowFileOpenFlags, ff.open_flags);
        fr.set_int(src, IntSlot::FlowFileEndTs, ff.end_ts);
        fr.set_int(src, IntSlot::FlowFileFd, ff.fd);
        fr.set_int(src, IntSlot::FlowFileRecvOps, ff.recv_ops);
        fr.set_int(src, IntSlot::FlowFileSendOps, ff.send_ops);
        fr.set_int(src, IntSlot::FlowFileRecvBytes, ff.recv_bytes);
        fr.set_int(src, IntSlot::FlowFileSendBytes, ff.send_bytes);
        fr
    }

    fn flatten_file_event(&self, raw: &RawRecord, fe: &FileEvent) -> FlatRecord {
        let mut fr = FlatRecord::new();
        let src = Source::SysFlow;
        // 보조 파일(rename 대상 등)은 분리된 SEC_FILE 슬롯 범위에 기록
        if let Some(file2) = &raw.file2 {
            fr.set_int(src, IntSlot::SecFileState, file2.state);
            fr.set_int(src, IntSlot::SecFileTs, file2.ts);
            fr.set_int(src, IntSlot::SecFileRestype, file2.restype);
            fr.set_str(src, StrSlot::SecFilePath, file2.path.clone());
            fr.set_str(src, StrSlot::SecFileOid, hex_oid(&file2.oid));
            fr.set_str(
                src,
                StrSlot::SecFileContainerId,
                file2.container_id.clone().unwrap_or_default(),
            );
        }
        fr.set_int(src, IntSlot::RecType, RecordKind::FileEvt.code());
        self.fill_entities(&mut fr, raw, raw.file.as_ref());
        fr.set_int(src, IntSlot::EvFileTs, fe.ts);
        fr.set_int(src, IntSlot::EvFileTid, fe.tid);
        fr.set_int(src, IntSlot::EvFileOpFlags, fe.op_flags);
        fr.set_int(src, IntSlot::EvFileRet, fe.ret);
        fr
    }

    fn flatten_proc_event(&self, raw: &RawRecord, pe: &ProcessEvent) -> FlatRecord {
        let mut fr = FlatRecord::new();
        let src = Source::SysFlow;
        fr.set_int(src, IntSlot::RecType, RecordKind::ProcEvt.code());
        self.fill_entities(&mut fr, raw, None);
        fr.set_int(src, IntSlot::EvProcTs, pe.ts);
        fr.set_int(src, IntSlot::EvProcTid, pe.tid);
        fr.set_int(src, IntSlot::EvProcOpFlags, pe.op_flags);
        fr.set_int(src, IntSlot::EvProcRet, pe.ret);
        fr
    }

    /// 동반 엔티티의 값을 슬롯에 복사합니다.
    ///
    /// 레코드는 이미 0 채움 상태이므로 누락 엔티티는 건너뛰면 됩니다.
    /// 헤더와 프로세스 누락은 업스트림 프로토콜 위반이므로 경고를 남깁니다.
    fn fill_entities(&self, fr: &mut FlatRecord, raw: &RawRecord, file: Option<&FileEntity>) {
        let src = Source::SysFlow;

        match &raw.header {
            Some(hdr) => self.fill_header(fr, hdr),
            None => {
                tracing::warn!("event record has no header entity, zero-filling");
            }
        }
        if let Some(cont) = &raw.container {
            self.fill_container(fr, cont);
        }
        match &raw.process {
            Some(proc) => self.fill_process(fr, proc),
            None => {
                tracing::warn!("event record has no process entity, zero-filling");
            }
        }
        if let Some(file) = file {
            fr.set_int(src, IntSlot::FileState, file.state);
            fr.set_int(src, IntSlot::FileTs, file.ts);
            fr.set_int(src, IntSlot::FileRestype, file.restype);
            fr.set_str(src, StrSlot::FilePath, file.path.clone());
            fr.set_str(src, StrSlot::FileOid, hex_oid(&file.oid));
            fr.set_str(
                src,
                StrSlot::FileContainerId,
                file.container_id.clone().unwrap_or_default(),
            );
        }
    }

    fn fill_header(&self, fr: &mut FlatRecord, hdr: &Header) {
        let src = Source::SysFlow;
        fr.set_int(src, IntSlot::HdrVersion, hdr.version);
        fr.set_str(src, StrSlot::HdrExporter, hdr.exporter.clone());
        fr.set_str(src, StrSlot::HdrIp, hdr.ip.clone());
    }

    fn fill_container(&self, fr: &mut FlatRecord, cont: &Container) {
        let src = Source::SysFlow;
        fr.set_str(src, StrSlot::ContId, cont.id.clone());
        fr.set_str(src, StrSlot::ContName, cont.name.clone());
        fr.set_str(src, StrSlot::ContImage, cont.image.clone());
        fr.set_str(src, StrSlot::ContImageId, cont.image_id.clone());
        fr.set_int(src, IntSlot::ContType, cont.kind.code());
        fr.set_int(src, IntSlot::ContPrivileged, i64::from(cont.privileged));
    }

    fn fill_process(&self, fr: &mut FlatRecord, proc: &Process) {
        let src = Source::SysFlow;
        fr.set_int(src, IntSlot::ProcState, proc.state);
        fr.set_int(src, IntSlot::ProcOidCreateTs, proc.oid.create_ts);
        fr.set_int(src, IntSlot::ProcOidHpid, proc.oid.hpid);
        if let Some(poid) = proc.poid {
            fr.set_int(src, IntSlot::ProcPoidCreateTs, poid.create_ts);
            fr.set_int(src, IntSlot::ProcPoidHpid, poid.hpid);
        }
        fr.set_int(src, IntSlot::ProcTs, proc.ts);
        fr.set_str(src, StrSlot::ProcExe, proc.exe.clone());
        fr.set_str(src, StrSlot::ProcExeArgs, proc.exe_args.clone());
        fr.set_int(src, IntSlot::ProcUid, proc.uid);
        fr.set_str(src, StrSlot::ProcUserName, proc.user_name.clone());
        fr.set_int(src, IntSlot::ProcGid, proc.gid);
        fr.set_str(src, StrSlot::ProcGroupName, proc.group_name.clone());
        fr.set_int(src, IntSlot::ProcTty, i64::from(proc.tty));
        fr.set_int(src, IntSlot::ProcEntry, i64::from(proc.entry));
        fr.set_str(
            src,
            StrSlot::ProcContainerId,
            proc.container_id.clone().unwrap_or_default(),
        );
    }

    /// 스테이지 메인 루프
    ///
    /// 입력 채널이 닫히고 비워지면 출력 송신자를 드롭하여 종료를
    /// 다운스트림으로 전파합니다.
    pub async fn run(self, mut rx: mpsc::Receiver<RawRecord>, tx: mpsc::Sender<FlatRecord>) {
        tracing::info!("starting flattener stage");
        while let Some(raw) = rx.recv().await {
            self.stats.records_in.fetch_add(1, Ordering::Relaxed);
            if let Some(flat) = self.flatten(&raw) {
                if tx.send(flat).await.is_err() {
                    tracing::warn!("output channel closed, stopping flattener");
                    return;
                }
                self.stats.records_out.fetch_add(1, Ordering::Relaxed);
            }
        }
        tracing::info!(
            records_in = self.stats.records_in(),
            records_out = self.stats.records_out(),
            "input channel closed, flattener stage done"
        );
    }
}

/// 파일 오브젝트 식별자를 16진수 문자열로 인코딩합니다.
fn hex_oid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // String에 대한 write!는 실패하지 않습니다
        let _ = write!(out, "{b:02x}");
    }
    out
}
