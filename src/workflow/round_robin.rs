//! 轮流发言会话 - 流程层
//!
//! 显式状态机：`Running { turn_index }` 有两条正常出口，
//! 出现终止词（`SentinelFound`）或达到最大轮数（`MaxTurnsReached`）。
//! 同一轮内多条消息含终止词时，以第一条为准，其后的消息不计入记录。

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::AppResult;
use crate::models::{BatchRange, ConversationMessage};
use crate::workflow::roster::AgentRoster;

/// 任务提示词的发言者名
pub const TASK_SOURCE: &str = "user";

/// 会话结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// 第 `turn` 轮（从 0 计）的发言含终止词
    SentinelFound { turn: usize },
    MaxTurnsReached,
    Cancelled,
}

/// 一个会话的完整记录
#[derive(Debug, Clone)]
pub struct SessionTranscript {
    pub messages: Vec<ConversationMessage>,
    pub outcome: SessionOutcome,
    pub turns: usize,
}

#[derive(Clone, Copy)]
enum SessionState {
    Running { turn_index: usize },
    Finished { outcome: SessionOutcome, turns: usize },
}

/// 轮流发言会话
pub struct RoundRobinSession {
    roster: AgentRoster,
    range: BatchRange,
    sentinel: String,
    max_turns: usize,
}

impl RoundRobinSession {
    pub fn new(
        roster: AgentRoster,
        range: BatchRange,
        sentinel: impl Into<String>,
        max_turns: usize,
    ) -> Self {
        Self {
            roster,
            range,
            sentinel: sentinel.into(),
            max_turns,
        }
    }

    /// 运行会话直到终止词出现、达到最大轮数或被取消
    ///
    /// 任务提示词作为第一条消息记入记录，但不参与终止词判断
    pub async fn run(
        mut self,
        task: impl Into<String>,
        cancel: &CancellationToken,
    ) -> AppResult<SessionTranscript> {
        let mut messages = vec![ConversationMessage::text(
            self.range,
            TASK_SOURCE,
            task,
            None,
        )];
        debug!(
            "[{}-{}] 发言顺序: {}",
            self.range.start,
            self.range.end,
            self.roster.names().join(" → ")
        );
        let mut state = SessionState::Running { turn_index: 0 };

        loop {
            let turn_index = match state {
                SessionState::Finished { outcome, turns } => {
                    return Ok(SessionTranscript {
                        messages,
                        outcome,
                        turns,
                    });
                }
                SessionState::Running { turn_index } => turn_index,
            };

            if turn_index >= self.max_turns || self.roster.is_empty() {
                info!(
                    "[{}-{}] 已达最大轮数 {}，结束会话",
                    self.range.start, self.range.end, self.max_turns
                );
                state = SessionState::Finished {
                    outcome: SessionOutcome::MaxTurnsReached,
                    turns: turn_index,
                };
                continue;
            }

            let Some(speaker) = self.roster.speaker(turn_index) else {
                continue;
            };
            let source = speaker.name().to_string();

            let replies = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                replies = speaker.respond(&messages) => Some(replies),
            };
            let Some(replies) = replies else {
                state = SessionState::Finished {
                    outcome: SessionOutcome::Cancelled,
                    turns: turn_index,
                };
                continue;
            };
            let replies = replies?;
            debug!("[{}] 第 {} 轮产生 {} 条消息", source, turn_index + 1, replies.len());

            state = SessionState::Running {
                turn_index: turn_index + 1,
            };
            for reply in replies {
                let hit = reply.content.contains(&self.sentinel);
                info!("[{}] => {}", source, reply.content);
                messages.push(ConversationMessage::text(
                    self.range,
                    source.as_str(),
                    reply.content,
                    reply.usage,
                ));
                if hit {
                    state = SessionState::Finished {
                        outcome: SessionOutcome::SentinelFound { turn: turn_index },
                        turns: turn_index + 1,
                    };
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::participants::{Participant, ParticipantReply};
    use async_trait::async_trait;

    /// 按脚本发言的参与者，脚本用完后重复最后一句
    struct Scripted {
        name: String,
        lines: Vec<Vec<&'static str>>,
        calls: usize,
    }

    impl Scripted {
        fn new(name: &str, lines: Vec<Vec<&'static str>>) -> Box<dyn Participant> {
            Box::new(Self {
                name: name.to_string(),
                lines,
                calls: 0,
            })
        }
    }

    #[async_trait]
    impl Participant for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        async fn respond(
            &mut self,
            _context: &[ConversationMessage],
        ) -> AppResult<Vec<ParticipantReply>> {
            let index = self.calls.min(self.lines.len().saturating_sub(1));
            self.calls += 1;
            Ok(self
                .lines
                .get(index)
                .map(|line| line.iter().map(|s| ParticipantReply::text(*s)).collect())
                .unwrap_or_default())
        }
    }

    fn session(roster: Vec<Box<dyn Participant>>, max_turns: usize) -> RoundRobinSession {
        RoundRobinSession::new(
            AgentRoster::from_participants(roster),
            BatchRange::new(0, 3),
            "exit",
            max_turns,
        )
    }

    fn sources(transcript: &SessionTranscript) -> Vec<&str> {
        transcript.messages.iter().map(|m| m.source.as_str()).collect()
    }

    #[tokio::test]
    async fn test_turns_rotate_in_roster_order() {
        let roster = vec![
            Scripted::new("a", vec![vec!["a1"]]),
            Scripted::new("b", vec![vec!["b1"]]),
            Scripted::new("c", vec![vec!["c1"], vec!["exit"]]),
        ];
        let transcript = session(roster, 20)
            .run("task", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sources(&transcript), vec!["user", "a", "b", "c", "a", "b", "c"]);
        assert_eq!(transcript.outcome, SessionOutcome::SentinelFound { turn: 5 });
        assert_eq!(transcript.turns, 6);
        assert_eq!(transcript.messages.last().unwrap().content, "exit");
    }

    #[tokio::test]
    async fn test_task_prompt_does_not_trigger_sentinel() {
        let roster = vec![Scripted::new("a", vec![vec!["ok"], vec!["please exit now"]])];
        let transcript = session(roster, 10)
            .run("type exit to stop", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(transcript.messages.len(), 3);
        assert_eq!(transcript.outcome, SessionOutcome::SentinelFound { turn: 1 });
    }

    #[tokio::test]
    async fn test_first_sentinel_in_turn_wins() {
        let roster = vec![Scripted::new(
            "a",
            vec![vec!["thinking", "exit here", "exit again", "more"]],
        )];
        let transcript = session(roster, 10)
            .run("task", &CancellationToken::new())
            .await
            .unwrap();

        let contents: Vec<&str> = transcript.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["task", "thinking", "exit here"]);
        assert_eq!(transcript.turns, 1);
    }

    #[tokio::test]
    async fn test_silent_roster_stops_at_max_turns() {
        let roster = vec![
            Scripted::new("a", vec![vec!["keep going"]]),
            Scripted::new("b", vec![vec![]]),
        ];
        let transcript = session(roster, 5)
            .run("task", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(transcript.outcome, SessionOutcome::MaxTurnsReached);
        // a 发言 3 次，b 每次都不发言
        assert_eq!(sources(&transcript), vec!["user", "a", "a", "a"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_turn() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let roster = vec![Scripted::new("a", vec![vec!["hello"]])];
        let transcript = session(roster, 5).run("task", &cancel).await.unwrap();

        assert_eq!(transcript.outcome, SessionOutcome::Cancelled);
        assert_eq!(transcript.messages.len(), 1);
        assert_eq!(transcript.turns, 0);
    }

    #[tokio::test]
    async fn test_messages_carry_batch_range() {
        let roster = vec![Scripted::new("a", vec![vec!["exit"]])];
        let transcript = session(roster, 5)
            .run("task", &CancellationToken::new())
            .await
            .unwrap();
        assert!(transcript
            .messages
            .iter()
            .all(|m| m.batch_start == 0 && m.batch_end == 2));
    }
}
