//! 파이프라인 드라이버 — 큐 생성, 스테이지 기동, 종료 전파
//!
//! 드라이버는 설정과 입력 수신자를 받아 플래트너 태스크와 인터프리터
//! 워커들을 띄우고, 출력 수신자를 호출자에게 돌려줍니다. 정책 로딩과
//! 컴파일은 시작 시점에 완료되며 실패하면 파이프라인은 기동하지
//! 않습니다.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use flowgate_core::config::{EngineConfig, EngineMode};
use flowgate_core::error::{FlowgateError, PipelineError};
use flowgate_core::raw::RawRecord;
use flowgate_core::table::{ProcessStore, ProcessTable};
use flowgate_flattener::{Flattener, FlattenerStats};
use flowgate_policy_engine::interpreter::InterpreterStats;
use flowgate_policy_engine::{
    compile, load_directory, AncestryCache, CompiledPolicy, EnrichedRecord, PolicyInterpreter,
};

/// 기동된 파이프라인 핸들
///
/// 입력 채널이 닫히면 스테이지들이 차례로 비우고 종료합니다.
/// [`Pipeline::join`]은 모든 스테이지의 종료를 기다립니다.
pub struct Pipeline {
    handles: Vec<JoinHandle<()>>,
    flattener_stats: Arc<FlattenerStats>,
    interpreter_stats: Arc<InterpreterStats>,
}

impl Pipeline {
    /// 설정과 입력 수신자로 파이프라인을 기동합니다.
    ///
    /// 반환값은 파이프라인 핸들과 보강 레코드 출력 수신자입니다.
    ///
    /// # Errors
    /// - 설정 검증 실패
    /// - 정책 디렉토리 누락/빈 디렉토리, 파싱/컴파일 오류
    pub async fn start(
        config: EngineConfig,
        input: mpsc::Receiver<RawRecord>,
    ) -> Result<(Self, mpsc::Receiver<EnrichedRecord>), FlowgateError> {
        config.validate()?;

        let policy = match (config.mode, &config.policies) {
            (EngineMode::Bypass, _) => CompiledPolicy::default(),
            (_, Some(path)) => {
                let set = load_directory(path).await?;
                compile(&set)?
            }
            // validate()가 이미 거부한 조합
            (_, None) => {
                return Err(FlowgateError::Pipeline(PipelineError::InitFailed(
                    "policies directory required".to_owned(),
                )))
            }
        };

        let store = Arc::new(ProcessStore::new());
        let cache = Arc::new(AncestryCache::new(
            Arc::clone(&store) as Arc<dyn ProcessTable>,
            config.ancestry_capacity,
        ));

        let (flat_tx, flat_rx) = mpsc::channel(config.channel_capacity);
        let (out_tx, out_rx) = mpsc::channel(config.channel_capacity);

        let flattener = Flattener::new(store);
        let flattener_stats = flattener.stats();

        let interpreter = Arc::new(PolicyInterpreter::new(
            config.mode,
            Arc::new(policy),
            cache,
        ));
        let interpreter_stats = interpreter.stats();

        let mut handles = Vec::with_capacity(config.workers + 1);
        handles.push(tokio::spawn(flattener.run(input, flat_tx)));

        // 워커들은 수신자를 공유합니다. 모든 워커가 종료하며 출력
        // 송신자를 드롭하면 다운스트림이 스트림 끝을 관측합니다.
        let shared_rx = Arc::new(Mutex::new(flat_rx));
        for _ in 0..config.workers {
            handles.push(tokio::spawn(Arc::clone(&interpreter).run(
                Arc::clone(&shared_rx),
                out_tx.clone(),
            )));
        }
        drop(out_tx);

        tracing::info!(
            mode = ?config.mode,
            workers = config.workers,
            capacity = config.channel_capacity,
            "pipeline started"
        );

        Ok((
            Self {
                handles,
                flattener_stats,
                interpreter_stats,
            },
            out_rx,
        ))
    }

    /// 모든 스테이지의 종료를 기다립니다.
    pub async fn join(self) -> Result<(), FlowgateError> {
        for handle in self.handles {
            handle
                .await
                .map_err(|e| FlowgateError::Pipeline(PipelineError::Join(e.to_string())))?;
        }
        tracing::info!("pipeline drained and stopped");
        Ok(())
    }

    /// 플래트너 스테이지 통계 핸들
    pub fn flattener_stats(&self) -> Arc<FlattenerStats> {
        Arc::clone(&self.flattener_stats)
    }

    /// 인터프리터 스테이지 통계 핸들
    pub fn interpreter_stats(&self) -> Arc<InterpreterStats> {
        Arc::clone(&self.interpreter_stats)
    }
}
