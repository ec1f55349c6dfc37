//! Customizable reply texts.
//!
//! A text set maps keys such as `roll.start` to weighted template lists.
//! Templates use a small mustache subset: `{{var}}`, `{{#var}}..{{/var}}`
//! (rendered when `var` is set and not empty) and `{{^var}}..{{/var}}`
//! (rendered otherwise).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use pt_dice::DiceRng;

/// Item id of the embedded default text set.
pub const DEFAULT_TEXTS_ID: &str = "default";

fn default_weight() -> u32 {
    1
}

fn enabled() -> bool {
    true
}

/// One candidate template for a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextItem {
    /// The template.
    pub text: String,
    /// Relative pick weight.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl TextItem {
    /// A template with weight 1.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: 1,
        }
    }
}

/// A named set of text templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTextConfig {
    /// Item id within the owning plugin.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Whether new channels enable the set.
    #[serde(default = "enabled")]
    pub default_enabled: bool,
    /// Templates by key.
    #[serde(default)]
    pub texts: BTreeMap<String, Vec<TextItem>>,
}

impl CustomTextConfig {
    /// An empty, default-enabled set.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            default_enabled: true,
            texts: BTreeMap::new(),
        }
    }

    /// Add a template for `key`.
    pub fn with_text(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts
            .entry(key.into())
            .or_default()
            .push(TextItem::new(text));
        self
    }
}

/// Variables available to a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextVars(HashMap<String, String>);

impl TextVars {
    /// No variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, builder style.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    /// Set a variable.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.0.insert(key.to_string(), value.to_string());
    }

    /// Look up a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn truthy(&self, key: &str) -> bool {
        matches!(self.get(key), Some(v) if !v.is_empty() && v != "false")
    }
}

/// Pick a template by weight. A single candidate skips the generator.
pub fn pick<'a>(items: &'a [TextItem], rng: &mut dyn DiceRng) -> Option<&'a TextItem> {
    match items {
        [] => None,
        [only] => Some(only),
        _ => {
            let total: u32 = items.iter().map(|i| i.weight).sum();
            if total == 0 {
                return items.first();
            }
            let mut target = rng.next_in(1, total);
            for item in items {
                if target <= item.weight {
                    return Some(item);
                }
                target -= item.weight;
            }
            items.last()
        }
    }
}

/// Render a template.
pub fn render(template: &str, vars: &TextVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let tag = after[..close].trim();
        let tail = &after[close + 2..];
        match tag.chars().next() {
            Some(sigil @ ('#' | '^')) => {
                let name = tag[1..].trim();
                let (body, remaining) = split_section(tail, name);
                if vars.truthy(name) == (sigil == '#') {
                    out.push_str(&render(body, vars));
                }
                rest = remaining;
            }
            Some('/') => rest = tail,
            _ => {
                out.push_str(vars.get(tag).unwrap_or_default());
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Split `text` at the `{{/name}}` closing the current section, honoring
/// nested sections of the same name.
fn split_section<'a>(text: &'a str, name: &str) -> (&'a str, &'a str) {
    let mut depth = 0usize;
    let mut cursor = 0usize;
    while let Some(offset) = text[cursor..].find("{{") {
        let start = cursor + offset;
        let Some(len) = text[start + 2..].find("}}") else {
            break;
        };
        let tag = text[start + 2..start + 2 + len].trim();
        let end = start + 2 + len + 2;
        if let Some(open) = tag.strip_prefix('#').or_else(|| tag.strip_prefix('^')) {
            if open.trim() == name {
                depth += 1;
            }
        } else if tag.strip_prefix('/').map(str::trim) == Some(name) {
            if depth == 0 {
                return (&text[..start], &text[end..]);
            }
            depth -= 1;
        }
        cursor = end;
    }
    (text, "")
}

const DEFAULT_TEXTS: &[(&str, &str)] = &[
    ("roll.start", "{{用户名}} 🎲{{#描述}} {{描述}}{{/描述}}"),
    ("roll.result", "{{掷骰输出}}"),
    ("roll.result.quiet", "{{掷骰结果}}"),
    ("roll.test", "{{#判定}} / {{目标值}} {{判定}}{{/判定}}"),
    ("roll.test.compound", "{{技能}} {{掷骰结果}} / {{目标值}} {{判定}}"),
    ("roll.dnd.line", "{{技能}} {{掷骰输出}}{{#判定}} / {{目标值}} {{判定}}{{/判定}}"),
    ("roll.inline.first", "{{用户名}} 先是 🎲{{#描述}} {{描述}}{{/描述}} {{掷骰输出}}"),
    ("roll.inline.middle", "然后 🎲{{#描述}} {{描述}}{{/描述}} {{掷骰输出}}"),
    ("roll.inline.last", "最后 🎲{{#描述}} {{描述}}{{/描述}}"),
    ("roll.hidden", "{{用户名}} 在帷幕后面偷偷地 🎲{{#描述}} {{描述}}{{/描述}}，猜猜结果是什么"),
    ("roll.message", "{{用户名}} 🎲 {{消息}}"),
    ("roll.vs.prior", "{{对方用户名}} 🎲{{#对方技能}} {{对方技能}}{{/对方技能}} {{对方掷骰结果}}{{#对方判定}} / {{对方目标值}} {{对方判定}}{{/对方判定}}"),
    ("roll.vs.win", "{{用户名}} 胜出！"),
    ("roll.vs.lose", "{{对方用户名}} 胜出！"),
    ("roll.vs.draw", "双方平手"),
    ("roll.sc.first", "{{用户名}} 🎲 理智检定 {{掷骰输出}} / {{目标值}} {{判定}}"),
    ("roll.sc.second", "{{用户名}} 🎲 理智损失 {{掷骰输出}}"),
    ("roll.sc.third", "{{用户名}} 🎲 理智变化：{{旧值}} → {{新值}}"),
    ("roll.sc.unsupported", "{{用户名}} 没有可用的理智值，请关联人物卡或在指令中写明"),
    ("roll.en.empty", "{{用户名}} 没有可成长的技能"),
    ("roll.en.list", "{{用户名}} 当前可成长的技能：{{技能列表}}"),
    ("roll.en.mark", "{{用户名}} 已标记成长：{{技能列表}}"),
    ("roll.en.clear", "{{用户名}} 已清除成长标记{{#技能列表}}：{{技能列表}}{{/技能列表}}"),
    ("roll.en.start", "{{用户名}} 🎲 技能成长"),
    ("roll.en.line", "{{技能}} {{掷骰结果}} / {{目标值}} {{#成长}}成功，成长 {{成长值}}，{{旧值}} → {{新值}}{{/成长}}{{^成长}}失败{{/成长}}"),
    ("roll.ri.line", "{{人物名}} 🎲 先攻 {{掷骰输出}}"),
    ("roll.ri.list", "当前先攻列表："),
    ("roll.ri.item", "{{序号}}. {{人物名}} {{先攻值}}"),
    ("roll.ri.empty", "当前先攻列表为空"),
    ("roll.ri.clear", "{{用户名}} 已清空先攻列表"),
    ("roll.ri.del", "{{用户名}} 删除先攻：{{人物名}}"),
    ("roll.st.prompt", "{{用户名}}({{人物卡名}}) 设置："),
    ("roll.st.line", "{{条目}} {{#掷骰输出}}{{掷骰输出}}，{{/掷骰输出}}{{#旧值}}{{旧值}} → {{/旧值}}{{新值}}"),
    ("roll.st.ability", "{{条目}} = {{表达式}}"),
    ("roll.st.show", "{{用户名}}({{人物卡名}})：\n{{条目}}"),
    ("roll.st.unsupported", "{{用户名}} 的指令无法识别要设置的条目"),
    ("roll.ds.start", "{{用户名}} 🎲 死亡豁免 {{掷骰输出}}"),
    ("roll.ds.best", "大成功！恢复 1 点生命值并清空死亡豁免"),
    ("roll.ds.worst", "大失败！死亡豁免失败 +2"),
    ("roll.ds.success", "成功，死亡豁免成功 +1"),
    ("roll.ds.failure", "失败，死亡豁免失败 +1"),
    ("roll.ds.tally", "当前 成功 {{成功次数}} / 失败 {{失败次数}}"),
    ("roll.ds.stable", "已成功三次，伤势稳定"),
    ("roll.ds.dead", "已失败三次，角色死亡"),
    ("roll.ds.unsupported", "{{用户名}} 没有关联 DND 人物卡，无法进行死亡豁免"),
    ("nn.show", "{{用户名}} 当前关联人物卡：{{人物卡名}}"),
    ("nn.show.empty", "{{用户名}} 没有关联人物卡"),
    ("nn.link", "{{用户名}} 已关联人物卡：{{人物卡名}}"),
    ("nn.clear", "{{用户名}} 已取消关联人物卡"),
    ("card.empty", "{{用户名}} 没有关联人物卡"),
    ("card.notfound", "没有找到名字包含 {{关键词}} 的人物卡"),
    ("card.search", "找到多张人物卡：{{人物卡列表}}，请输入更精确的名称"),
    ("card.nopermission", "{{用户名}} 没有操作人物卡 {{人物卡名}} 的权限"),
    ("card.exist", "人物卡 {{人物卡名}} 已存在"),
    ("pc.new", "{{用户名}} 已创建并关联人物卡：{{人物卡名}}"),
    ("pc.del", "{{用户名}} 已删除人物卡：{{人物卡名}}"),
    ("pc.list", "当前人物卡：{{人物卡列表}}"),
    ("test.worst", "大失败"),
    ("test.failure", "失败"),
    ("test.success", "成功"),
    ("test.hard", "困难成功"),
    ("test.extreme", "极难成功"),
    ("test.best", "大成功"),
];

static DEFAULTS: Lazy<CustomTextConfig> = Lazy::new(|| {
    let mut set = CustomTextConfig::new(DEFAULT_TEXTS_ID, "默认文案");
    set.description = "内置的默认回复文案".into();
    for (key, text) in DEFAULT_TEXTS {
        set = set.with_text(*key, *text);
    }
    set
});

/// The built-in text set.
pub fn default_texts() -> &'static CustomTextConfig {
    &DEFAULTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_dice::{FixedRng, SequenceRng};

    #[test]
    fn renders_variables_and_sections() {
        let vars = TextVars::new().with("用户名", "Maca").with("描述", "侦察");
        assert_eq!(
            render("{{用户名}} 🎲{{#描述}} {{描述}}{{/描述}}", &vars),
            "Maca 🎲 侦察"
        );
        let vars = TextVars::new().with("用户名", "Maca");
        assert_eq!(render("{{用户名}} 🎲{{#描述}} {{描述}}{{/描述}}", &vars), "Maca 🎲");
        assert_eq!(render("{{^描述}}无{{/描述}}", &vars), "无");
    }

    #[test]
    fn empty_and_false_are_falsy() {
        let vars = TextVars::new().with("a", "").with("b", false);
        assert_eq!(render("{{#a}}x{{/a}}{{#b}}y{{/b}}{{^b}}z{{/b}}", &vars), "z");
    }

    #[test]
    fn unclosed_tags_stay_literal() {
        let vars = TextVars::new();
        assert_eq!(render("a {{b", &vars), "a {{b");
        assert_eq!(render("{{missing}}!", &vars), "!");
    }

    #[test]
    fn nested_sections() {
        let vars = TextVars::new().with("a", "1").with("b", "2");
        assert_eq!(render("{{#a}}[{{#b}}{{b}}{{/b}}]{{/a}}", &vars), "[2]");
    }

    #[test]
    fn single_item_skips_rng() {
        struct Panics;
        impl DiceRng for Panics {
            fn next_in(&mut self, _low: u32, _high: u32) -> u32 {
                panic!("rng should not be used")
            }
        }
        let items = [TextItem::new("only")];
        assert_eq!(pick(&items, &mut Panics).unwrap().text, "only");
    }

    #[test]
    fn weighted_pick() {
        let items = [
            TextItem { text: "a".into(), weight: 1 },
            TextItem { text: "b".into(), weight: 3 },
        ];
        assert_eq!(pick(&items, &mut FixedRng(1)).unwrap().text, "a");
        assert_eq!(pick(&items, &mut FixedRng(2)).unwrap().text, "b");
        let mut seq = SequenceRng::new(vec![4, 1]);
        assert_eq!(pick(&items, &mut seq).unwrap().text, "b");
        assert_eq!(pick(&items, &mut seq).unwrap().text, "a");
    }

    #[test]
    fn defaults_cover_level_names() {
        let texts = default_texts();
        assert!(texts.texts.contains_key("test.success"));
        assert!(texts.texts.contains_key("roll.sc.third"));
    }
}
