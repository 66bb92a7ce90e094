//! 参与者名单
//!
//! 名单在构建时确定顺序，即发言顺序；会话期间不增删成员

use std::sync::Arc;

use crate::clients::{ModelTransport, WebSearch};
use crate::services::HumanInput;
use crate::workflow::participants::{
    AssistantParticipant, Participant, UserProxyParticipant, WebSurferParticipant,
};

pub const DATA_AGENT: &str = "data_agent";
pub const WEB_SURFER: &str = "web_surfer";
pub const ASSISTANT: &str = "assistant";
pub const USER_PROXY: &str = "user_proxy";

const DATA_AGENT_SYSTEM_MESSAGE: &str = "你是一位資料分析專家，負責分析待辦事項的截止時間、重要性與狀態，排定優先順序，確保重要且緊急的任務被優先完成。";
const ASSISTANT_SYSTEM_MESSAGE: &str = "你是一位樂於助人的助理，負責綜合團隊的分析與搜尋結果，提供最佳執行策略，幫助使用者更高效完成待辦事項。";

/// 一个块使用的参与者名单
pub struct AgentRoster {
    participants: Vec<Box<dyn Participant>>,
}

impl AgentRoster {
    /// 按固定顺序组建名单：资料分析 → 网络搜索 → 通用助理 → 人工代理
    pub fn build(
        transport: Arc<dyn ModelTransport>,
        search: Arc<dyn WebSearch>,
        human: Arc<dyn HumanInput>,
    ) -> Self {
        let participants: Vec<Box<dyn Participant>> = vec![
            Box::new(AssistantParticipant::new(
                DATA_AGENT,
                DATA_AGENT_SYSTEM_MESSAGE,
                transport.clone(),
            )),
            Box::new(WebSurferParticipant::new(WEB_SURFER, transport.clone(), search)),
            Box::new(AssistantParticipant::new(
                ASSISTANT,
                ASSISTANT_SYSTEM_MESSAGE,
                transport,
            )),
            Box::new(UserProxyParticipant::new(USER_PROXY, human)),
        ];
        Self::from_participants(participants)
    }

    /// 使用自定义参与者组建名单
    pub fn from_participants(participants: Vec<Box<dyn Participant>>) -> Self {
        Self { participants }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.participants.iter().map(|p| p.name()).collect()
    }

    /// 第 `turn_index` 轮的发言者
    pub(crate) fn speaker(&mut self, turn_index: usize) -> Option<&mut Box<dyn Participant>> {
        let len = self.participants.len();
        if len == 0 {
            return None;
        }
        self.participants.get_mut(turn_index % len)
    }
}

/// 为每个块组建名单
///
/// 只共享不可变的客户端句柄，每个块得到一份独立的名单
#[derive(Clone)]
pub struct RosterFactory {
    transport: Arc<dyn ModelTransport>,
    search: Arc<dyn WebSearch>,
    human: Arc<dyn HumanInput>,
}

impl RosterFactory {
    pub fn new(
        transport: Arc<dyn ModelTransport>,
        search: Arc<dyn WebSearch>,
        human: Arc<dyn HumanInput>,
    ) -> Self {
        Self {
            transport,
            search,
            human,
        }
    }

    pub fn build(&self) -> AgentRoster {
        AgentRoster::build(
            self.transport.clone(),
            self.search.clone(),
            self.human.clone(),
        )
    }
}
