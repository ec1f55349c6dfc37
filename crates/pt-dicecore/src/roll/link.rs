//! Card linking: `nn`, `nn clr` and `nn keyword`.

use crate::error::DiceResult;

use super::{RollEnv, RollEvaluator, RollKind, strip_keyword};

#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkAction {
    Show,
    Clear,
    Link(String),
}

/// Shows, clears or changes the sender's linked card.
#[derive(Debug, Clone)]
pub struct LinkRoll {
    action: LinkAction,
    target: Option<String>,
    output: String,
}

impl LinkRoll {
    /// Link command for `raw`, the text after `nn`.
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        let action = if raw.is_empty() {
            LinkAction::Show
        } else if strip_keyword(raw, "clr") == Some("") {
            LinkAction::Clear
        } else {
            LinkAction::Link(raw.to_string())
        };
        Self {
            action,
            target: None,
            output: String::new(),
        }
    }

    /// The card `apply` links, once resolved.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

impl RollEvaluator for LinkRoll {
    fn kind(&self) -> RollKind {
        RollKind::Link
    }

    fn roll(&mut self, env: &mut RollEnv<'_>) -> DiceResult<()> {
        let base = env.vars();
        self.output = match &self.action {
            LinkAction::Show => match env.linked_name() {
                Some(_) => env.render("nn.show", &base),
                None => env.render("nn.show.empty", &base),
            },
            LinkAction::Clear => env.render("nn.clear", &base),
            LinkAction::Link(keyword) => {
                let found: Vec<String> = env.cards.search(keyword).into_iter().map(String::from).collect();
                match found.as_slice() {
                    [] => env.render("card.notfound", &base.with("关键词", keyword)),
                    [name] => {
                        let vars = base.with("人物卡名", name);
                        let held_by_other = env
                            .cards
                            .holder(&env.context.channel_id, name)
                            .is_some_and(|holder| holder != env.context.user_id);
                        if held_by_other && !env.context.is_admin() {
                            env.render("card.nopermission", &vars)
                        } else {
                            self.target = Some(name.clone());
                            env.render("nn.link", &vars)
                        }
                    }
                    names => env.render("card.search", &base.with("人物卡列表", names.join("、"))),
                }
            }
        };
        Ok(())
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn apply(&mut self, env: &mut RollEnv<'_>) -> DiceResult<Vec<String>> {
        let (channel, user) = (&env.context.channel_id, &env.context.user_id);
        match (&self.action, &self.target) {
            (LinkAction::Clear, _) => env.cards.link(channel, user, None),
            (LinkAction::Link(_), Some(name)) => env.cards.link(channel, user, Some(name)),
            _ => {}
        }
        Ok(Vec::new())
    }
}
