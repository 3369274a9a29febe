use crate::models::Turn;

pub const REQUEST_FAILED_TEXT: &str = "Sorry, your request could not be processed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    User,
    Bot,
    /// Bot-styled notice for a failed send.
    Error,
}

/// One rendered chat entry. Bot text is markdown; user text is shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatNode {
    pub role: NodeRole,
    pub text: String,
    pub attachments: Vec<String>,
}

pub fn user_node(prompt: &str, files: &[String]) -> ChatNode {
    ChatNode {
        role: NodeRole::User,
        text: prompt.to_string(),
        attachments: files.to_vec(),
    }
}

pub fn bot_node(text: &str, files: &[String]) -> ChatNode {
    ChatNode {
        role: NodeRole::Bot,
        text: text.to_string(),
        attachments: files.to_vec(),
    }
}

pub fn error_node() -> ChatNode {
    ChatNode {
        role: NodeRole::Error,
        text: REQUEST_FAILED_TEXT.to_string(),
        attachments: Vec::new(),
    }
}

/// User node then bot node, per turn.
pub fn build_turn_nodes(turns: &[Turn]) -> Vec<ChatNode> {
    turns
        .iter()
        .flat_map(|turn| {
            [
                user_node(&turn.prompt, &turn.attached_files),
                bot_node(&turn.response, &turn.response_files),
            ]
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ChatArea {
    nodes: Vec<ChatNode>,
    /// Lines scrolled up from the newest entry; `0` pins the view to the bottom.
    scroll_from_bottom: usize,
    /// Furthest the view can scroll, as measured by the last layout pass.
    max_scroll: usize,
    new_conversation: bool,
}

impl Default for ChatArea {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            scroll_from_bottom: 0,
            max_scroll: 0,
            new_conversation: true,
        }
    }
}

impl ChatArea {
    pub fn nodes(&self) -> &[ChatNode] {
        &self.nodes
    }

    pub fn is_new_conversation(&self) -> bool {
        self.new_conversation
    }

    /// Empty chat in the "new conversation" state.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.new_conversation = true;
        self.scroll_to_bottom();
    }

    /// Re-render from empty.
    pub fn replace(&mut self, nodes: Vec<ChatNode>) {
        self.nodes = nodes;
        self.new_conversation = false;
        self.scroll_to_bottom();
    }

    pub fn push(&mut self, node: ChatNode) {
        self.nodes.push(node);
        self.new_conversation = false;
        self.scroll_to_bottom();
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_from_bottom
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_from_bottom = self
            .scroll_from_bottom
            .saturating_add(lines)
            .min(self.max_scroll);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    /// Records how far the rendered transcript can scroll and pulls the offset back inside it.
    pub fn set_max_scroll(&mut self, max_scroll: usize) {
        self.max_scroll = max_scroll;
        self.scroll_from_bottom = self.scroll_from_bottom.min(max_scroll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_alternate_user_then_bot() {
        let turns = vec![
            Turn {
                prompt: "Review my CV".to_string(),
                attached_files: vec!["cv.pdf".to_string()],
                response: "**Strong** summary".to_string(),
                response_files: Vec::new(),
            },
            Turn {
                prompt: "Thanks".to_string(),
                response: "You're welcome".to_string(),
                ..Turn::default()
            },
        ];
        let nodes = build_turn_nodes(&turns);
        let roles: Vec<_> = nodes.iter().map(|n| n.role).collect();
        assert_eq!(
            roles,
            vec![NodeRole::User, NodeRole::Bot, NodeRole::User, NodeRole::Bot]
        );
        assert_eq!(nodes[0].attachments, vec!["cv.pdf".to_string()]);
        assert_eq!(nodes[1].text, "**Strong** summary");
    }

    #[test]
    fn every_render_scrolls_to_bottom() {
        let mut area = ChatArea::default();
        assert!(area.is_new_conversation());
        area.push(user_node("hi", &[]));
        area.set_max_scroll(20);
        area.scroll_up(12);
        area.push(bot_node("hello", &[]));
        assert_eq!(area.scroll_offset(), 0);
        assert!(!area.is_new_conversation());

        area.scroll_up(3);
        area.replace(Vec::new());
        assert_eq!(area.scroll_offset(), 0);

        area.push(error_node());
        area.clear();
        assert!(area.nodes().is_empty());
        assert!(area.is_new_conversation());
    }

    #[test]
    fn scrolling_stops_at_the_top_of_the_transcript() {
        let mut area = ChatArea::default();
        area.set_max_scroll(7);
        for _ in 0..4 {
            area.scroll_up(5);
        }
        assert_eq!(area.scroll_offset(), 7);
        area.scroll_down(5);
        assert_eq!(area.scroll_offset(), 2);

        area.scroll_up(5);
        area.set_max_scroll(3);
        assert_eq!(area.scroll_offset(), 3);
        area.scroll_down(10);
        assert_eq!(area.scroll_offset(), 0);
    }
}
