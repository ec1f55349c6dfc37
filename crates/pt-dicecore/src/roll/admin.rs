//! Card administration: `pc new [type] [name]`, `pc del [name]` and
//! `pc list`.

use tracing::debug;

use crate::card::{Card, CardOps, CardType};
use crate::error::DiceResult;

use super::{RollEnv, RollEvaluator, RollKind, strip_keyword};

#[derive(Debug, Clone, PartialEq, Eq)]
enum AdminAction {
    New {
        card_type: CardType,
        name: Option<String>,
    },
    Delete(Option<String>),
    List,
}

impl AdminAction {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(rest) = strip_keyword(raw, "new") {
            let mut words = rest.split_whitespace();
            let first = words.next();
            let (card_type, name) = match first.and_then(CardType::parse) {
                Some(card_type) => (card_type, words.collect::<Vec<_>>().join(" ")),
                None => (CardType::Coc, rest.to_string()),
            };
            let name = Some(name).filter(|n| !n.is_empty());
            return AdminAction::New { card_type, name };
        }
        if let Some(rest) = strip_keyword(raw, "del").or_else(|| strip_keyword(raw, "rm")) {
            return AdminAction::Delete(Some(rest.to_string()).filter(|n| !n.is_empty()));
        }
        AdminAction::List
    }
}

/// Creates, deletes or lists cards.
#[derive(Debug, Clone)]
pub struct CardAdminRoll {
    action: AdminAction,
    target: Option<(CardType, String)>,
    output: String,
}

impl CardAdminRoll {
    /// Admin command for `raw`, the text after `pc`.
    pub fn new(raw: &str) -> Self {
        Self {
            action: AdminAction::parse(raw),
            target: None,
            output: String::new(),
        }
    }
}

impl RollEvaluator for CardAdminRoll {
    fn kind(&self) -> RollKind {
        RollKind::CardAdmin
    }

    fn roll(&mut self, env: &mut RollEnv<'_>) -> DiceResult<()> {
        let base = env.vars();
        self.output = match &self.action {
            AdminAction::New { card_type, name } => {
                let name = name.clone().unwrap_or_else(|| env.context.username.clone());
                let vars = base.with("人物卡名", &name);
                if env.cards.contains(&name) {
                    env.render("card.exist", &vars)
                } else {
                    self.target = Some((*card_type, name));
                    env.render("pc.new", &vars)
                }
            }
            AdminAction::Delete(name) => match name.clone().or_else(|| env.linked_name()) {
                None => env.render("card.empty", &base),
                Some(name) if !env.cards.contains(&name) => {
                    env.render("card.notfound", &base.with("关键词", name))
                }
                Some(name) => {
                    let vars = base.with("人物卡名", &name);
                    let holder = env.cards.holder(&env.context.channel_id, &name);
                    let allowed = env.context.is_admin()
                        || holder.is_none_or(|holder| holder == env.context.user_id);
                    if allowed {
                        let card_type = env.cards.get(&name).map_or(CardType::General, |c| c.card_type());
                        self.target = Some((card_type, name));
                        env.render("pc.del", &vars)
                    } else {
                        env.render("card.nopermission", &vars)
                    }
                }
            },
            AdminAction::List => {
                let names = env.cards.names();
                let list = if names.is_empty() {
                    "无".to_string()
                } else {
                    names.join("、")
                };
                env.render("pc.list", &base.with("人物卡列表", list))
            }
        };
        Ok(())
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn apply(&mut self, env: &mut RollEnv<'_>) -> DiceResult<Vec<String>> {
        let Some((card_type, name)) = &self.target else {
            return Ok(Vec::new());
        };
        match self.action {
            AdminAction::New { .. } => {
                env.cards.register(Card::new(*card_type, name));
                env.cards
                    .link(&env.context.channel_id, &env.context.user_id, Some(name));
                debug!(target: "dicecore::card", %name, %card_type, "card created");
                Ok(vec![name.clone()])
            }
            AdminAction::Delete(_) => {
                env.cards.unregister(name);
                Ok(Vec::new())
            }
            AdminAction::List => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roll::testing::Harness;
    use pt_dice::FixedRng;

    #[test]
    fn parses_forms() {
        assert_eq!(
            AdminAction::parse("new dnd Tav"),
            AdminAction::New {
                card_type: CardType::Dnd,
                name: Some("Tav".into())
            }
        );
        assert_eq!(
            AdminAction::parse("new 调查员 甲"),
            AdminAction::New {
                card_type: CardType::Coc,
                name: Some("调查员 甲".into())
            }
        );
        assert_eq!(
            AdminAction::parse("new"),
            AdminAction::New {
                card_type: CardType::Coc,
                name: None
            }
        );
        assert_eq!(AdminAction::parse("del"), AdminAction::Delete(None));
        assert_eq!(AdminAction::parse(""), AdminAction::List);
    }

    #[test]
    fn new_creates_and_links() {
        let mut harness = Harness::new();
        let roll = harness.run(CardAdminRoll::new("new dnd Tav"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca 已创建并关联人物卡：Tav");
        assert_eq!(harness.cards.get("Tav").map(|c| c.card_type()), Some(CardType::Dnd));
        assert_eq!(harness.cards.linked_name("c1", "u1").as_deref(), Some("Tav"));

        let roll = harness.run(CardAdminRoll::new("new Tav"), &mut FixedRng(1));
        assert_eq!(roll.output(), "人物卡 Tav 已存在");
    }

    #[test]
    fn new_defaults_to_the_username() {
        let mut harness = Harness::new();
        harness.run(CardAdminRoll::new("new"), &mut FixedRng(1));
        assert_eq!(harness.cards.get("Maca").map(|c| c.card_type()), Some(CardType::Coc));
    }

    #[test]
    fn delete_checks_the_holder() {
        let mut harness = Harness::new().with_card(Card::new(CardType::Coc, "Maca"));
        harness.cards.register(Card::new(CardType::Coc, "Tav"));
        harness.cards.link("c1", "u2", Some("Tav"));

        let roll = harness.run(CardAdminRoll::new("del Tav"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca 没有操作人物卡 Tav 的权限");
        assert!(harness.cards.contains("Tav"));

        let roll = harness.run(CardAdminRoll::new("del"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca 已删除人物卡：Maca");
        assert!(!harness.cards.contains("Maca"));

        let roll = harness.run(CardAdminRoll::new("del Lae"), &mut FixedRng(1));
        assert_eq!(roll.output(), "没有找到名字包含 Lae 的人物卡");
    }

    #[test]
    fn lists_cards() {
        let mut harness = Harness::new();
        let roll = harness.run(CardAdminRoll::new("list"), &mut FixedRng(1));
        assert_eq!(roll.output(), "当前人物卡：无");
        harness.cards.register(Card::new(CardType::Coc, "Tav"));
        harness.cards.register(Card::new(CardType::Coc, "Maca"));
        let roll = harness.run(CardAdminRoll::new(""), &mut FixedRng(1));
        assert_eq!(roll.output(), "当前人物卡：Maca、Tav");
    }
}
