//! 变更协调器
//!
//! 两个状态：`Idle` 与 `PassInFlight`。一次重新高亮期间观察者处于断开状态，
//! 因此本次写入不会再次触发自身；断开期间发生的变更全部不可见。

use std::sync::Arc;
use std::time::Duration;

use markup5ever_rcdom::Handle;
use tokio::time::Instant;

use crate::highlight::annotator::unannotate_all_observed;
use crate::highlight::{AnnotationReport, DomAnnotator, MatchEngine};
use crate::vocab::Vocabulary;

use super::mutation::{batch_is_relevant, DomObserver, MutationRecord, MutationSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    PassInFlight,
}

/// 一次完整重新高亮的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub restored: usize,
    pub annotation: AnnotationReport,
}

pub struct MutationCoordinator<O> {
    observer: O,
    state: PassState,
    debounce: Duration,
    pending_deadline: Option<Instant>,
    passes_run: u64,
}

impl<O> MutationCoordinator<O>
where
    O: DomObserver + MutationSink,
{
    pub fn new(observer: O, debounce: Duration) -> Self {
        Self {
            observer,
            state: PassState::Idle,
            debounce,
            pending_deadline: None,
            passes_run: 0,
        }
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// 已安排但尚未触发的防抖截止时间
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending_deadline
    }

    pub fn passes_run(&self) -> u64 {
        self.passes_run
    }

    /// 处理一批变更记录
    ///
    /// 整批视为一次触发：只要存在一条相关记录就（重新）设置唯一的防抖计时器。
    /// 返回是否安排了重新高亮。
    pub fn on_mutations(&mut self, records: &[MutationRecord], now: Instant) -> bool {
        if self.state == PassState::PassInFlight || !self.observer.is_connected() {
            return false;
        }
        if !batch_is_relevant(records) {
            return false;
        }

        self.pending_deadline = Some(now + self.debounce);
        tracing::trace!("防抖计时器已重置, {} 条记录", records.len());
        true
    }

    /// 防抖到期时执行一次重新高亮
    pub fn fire_if_due(
        &mut self,
        now: Instant,
        root: &Handle,
        vocabulary: &Arc<Vocabulary>,
    ) -> Option<PassReport> {
        match self.pending_deadline {
            Some(deadline) if deadline <= now => Some(self.run_pass(root, Arc::clone(vocabulary))),
            _ => None,
        }
    }

    /// 立即执行一次完整的重新高亮
    ///
    /// `vocabulary` 是开始时的快照，执行期间到达的推送只影响下一次。
    pub fn run_pass(&mut self, root: &Handle, vocabulary: Arc<Vocabulary>) -> PassReport {
        self.state = PassState::PassInFlight;
        self.pending_deadline = None;
        self.observer.disconnect();

        let sink: &dyn MutationSink = &self.observer;
        let restored = unannotate_all_observed(root, sink);

        let annotation = if vocabulary.is_empty() {
            AnnotationReport::default()
        } else {
            match MatchEngine::new(vocabulary) {
                Ok(engine) => DomAnnotator::with_sink(&engine, sink).annotate(root),
                Err(e) => {
                    tracing::warn!("重新高亮时无法构建匹配引擎: {}", e);
                    AnnotationReport::default()
                }
            }
        };

        self.observer.observe(root);
        self.state = PassState::Idle;
        self.passes_run += 1;

        tracing::debug!(
            "第 {} 次高亮完成: 还原 {}, 新建 {}",
            self.passes_run,
            restored,
            annotation.spans_created
        );

        PassReport {
            restored,
            annotation,
        }
    }
}
