use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::lesson::{DialogueChoice, DialogueMessage, DialogueNode};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DialogueError {
    #[error("dialogue start node not found: {0}")]
    StartNodeMissing(String),
    #[error("dialogue is at a terminal node")]
    Terminal,
    #[error("unknown choice id: {0}")]
    UnknownChoice(String),
    #[error("choice {choice} points at missing node {target}")]
    MissingTarget { choice: String, target: String },
}

/// 对外暴露的当前状态快照
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueState {
    pub message: Option<DialogueMessage>,
    pub choices: Vec<DialogueChoice>,
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptLine {
    pub speaker: String,
    pub text: String,
}

/// 对话图遍历
///
/// 每次选择只走一条边；历史只追加，图中有环时同一节点会重复出现。
#[derive(Debug, Clone)]
pub struct DialogueEngine {
    nodes: Vec<DialogueNode>,
    index: HashMap<String, usize>,
    current: Option<usize>,
    history: Vec<usize>,
    taken: Vec<DialogueChoice>,
}

impl DialogueEngine {
    /// 从 `start_id` 开始；找不到时没有当前节点，对话视为已结束
    pub fn new(tree: Vec<DialogueNode>, start_id: &str) -> Self {
        let mut index = HashMap::with_capacity(tree.len());
        for (pos, node) in tree.iter().enumerate() {
            // 重复 id 以第一个为准
            index.entry(node.id.clone()).or_insert(pos);
        }

        let mut engine = Self {
            nodes: tree,
            index,
            current: None,
            history: Vec::new(),
            taken: Vec::new(),
        };
        if let Err(err) = engine.start_at(start_id) {
            tracing::error!(error = %err, "failed to initialize dialogue");
        }
        engine
    }

    fn start_at(&mut self, start_id: &str) -> Result<(), DialogueError> {
        self.current = None;
        self.history.clear();
        self.taken.clear();

        let pos = *self
            .index
            .get(start_id)
            .ok_or_else(|| DialogueError::StartNodeMissing(start_id.to_string()))?;
        self.current = Some(pos);
        self.history.push(pos);
        Ok(())
    }

    pub fn current_node(&self) -> Option<&DialogueNode> {
        self.current.map(|pos| &self.nodes[pos])
    }

    pub fn current_state(&self) -> DialogueState {
        match self.current_node() {
            Some(node) => DialogueState {
                message: Some(node.message.clone()),
                choices: node.choices().to_vec(),
                is_complete: node.is_terminal(),
            },
            None => DialogueState {
                message: None,
                choices: Vec::new(),
                is_complete: true,
            },
        }
    }

    /// 走一条边，失败时状态不变
    pub fn try_choice(&mut self, choice_id: &str) -> Result<&DialogueNode, DialogueError> {
        let node = self.current_node().ok_or(DialogueError::Terminal)?;
        if node.is_terminal() {
            return Err(DialogueError::Terminal);
        }

        let choice = node
            .choices()
            .iter()
            .find(|choice| choice.id == choice_id)
            .ok_or_else(|| DialogueError::UnknownChoice(choice_id.to_string()))?;

        let next = *self
            .index
            .get(&choice.next_message_id)
            .ok_or_else(|| DialogueError::MissingTarget {
                choice: choice.id.clone(),
                target: choice.next_message_id.clone(),
            })?;

        let choice = choice.clone();
        self.taken.push(choice);
        self.current = Some(next);
        self.history.push(next);
        Ok(&self.nodes[next])
    }

    pub fn make_choice(&mut self, choice_id: &str) -> bool {
        match self.try_choice(choice_id) {
            Ok(_) => true,
            Err(err @ DialogueError::MissingTarget { .. }) => {
                tracing::error!(error = %err, "dialogue tree is inconsistent");
                false
            }
            Err(err) => {
                tracing::debug!(error = %err, "dialogue choice rejected");
                false
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current_node().map_or(true, DialogueNode::is_terminal)
    }

    pub fn restart(&mut self, start_id: &str) -> bool {
        match self.start_at(start_id) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "failed to restart dialogue");
                false
            }
        }
    }

    /// 访问过的节点，按访问顺序
    pub fn history(&self) -> Vec<&DialogueNode> {
        self.history.iter().map(|&pos| &self.nodes[pos]).collect()
    }

    /// 对话记录：节点消息与其间所选的回答交替出现
    pub fn transcript(&self) -> Vec<TranscriptLine> {
        let mut lines = Vec::with_capacity(self.history.len() + self.taken.len());
        for (step, &pos) in self.history.iter().enumerate() {
            let message = &self.nodes[pos].message;
            lines.push(TranscriptLine {
                speaker: message.speaker.clone(),
                text: message.text.clone(),
            });
            if let Some(choice) = self.taken.get(step) {
                lines.push(TranscriptLine {
                    speaker: LEARNER_SPEAKER.to_string(),
                    text: choice.text.clone(),
                });
            }
        }
        lines
    }
}

const LEARNER_SPEAKER: &str = "learner";
