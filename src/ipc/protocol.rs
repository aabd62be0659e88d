//! The request grammar parsed from protocol lines, shared by the IPC socket
//! and the configuration pipeline (spec.md §4.6, §6 "Request grammar").
use std::str::FromStr;

use crate::bindings::{KeyCombo, MouseCombo};
use crate::color::Color;
use crate::rules::{Placement, Rule};
use crate::state::{BorderBand, Direction};

/// Everything that can go wrong turning a protocol line into a [Request]
/// (spec.md §7(a): "protocol parse ... -> `ERR <kind>` ... no state change").
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A combo token named a modifier outside `Mod1`..`Mod4`, `Shift`, `Ctrl`
    #[error("unknown-modifier {0}")]
    UnknownModifier(String),

    /// A combo token named a button outside `Left`, `Middle`, `Right`,
    /// `Button1`..`Button3`
    #[error("unknown-button {0}")]
    UnknownButton(String),

    /// A combo token had no key/button segment
    #[error("bad-combo {0}")]
    BadCombo(String),

    /// The line's first token did not match any known verb
    #[error("unknown {0}")]
    UnknownVerb(String),

    /// A verb was given fewer arguments than its grammar requires
    #[error("missing-argument {verb}")]
    MissingArgument {
        /// The verb the argument was missing from
        verb: String,
    },

    /// An argument did not match its verb's expected shape
    #[error("bad-argument {verb} {text}")]
    BadArgument {
        /// The verb the bad argument belongs to
        verb: String,
        /// The offending token
        text: String,
    },

    /// A `rule`/`spawn` hint token was not `key=value`
    #[error("bad-key-value {0}")]
    BadKeyValue(String),

    /// The line's shell quoting did not close (unterminated quote)
    #[error("bad-quoting {0}")]
    Quoting(String),
}

/// `query`'s argument (spec.md §11.5, supplementing the base grammar).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTarget {
    /// `query windows`
    Windows,
    /// `query workspaces`
    Workspaces,
    /// `query monitors`
    Monitors,
}

/// A parsed request line (spec.md §6 "Request grammar"). Each variant mirrors
/// one table row; the IPC server and the configuration pipeline both parse
/// lines down to this type before dispatching (spec.md §2, shared command
/// dispatcher).
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// `set-workspaces <index:label>...`
    SetWorkspaces(Vec<(usize, String)>),
    /// `bind <keycombo> <command>`
    BindKey(KeyCombo, String),
    /// `bind <buttoncombo> <command>` (spec.md §9 open question resolved in
    /// DESIGN.md: combos ending in `Button1`/`Button2`/`Button3` bind the mouse)
    BindButton(MouseCombo, String),
    /// `rule key=value...`
    Rule(Rule),
    /// `scratch <name>:<spawn-command>`
    ScratchRegister(String, String),
    /// `scratch toggle <name>`
    ScratchToggle(String),
    /// `set-gap <px>`
    SetGap(u32),
    /// `set-border inner|outer <px>`
    SetBorderWidth(BorderBand, u32),
    /// `set-color inner|outer <#rrggbb>`
    SetBorderColor(BorderBand, Color),
    /// `bar show-occupied-only true|false`
    SetBarShowOccupiedOnly(bool),
    /// `spawn <cmd> [key=value...]`
    Spawn(String, Placement),
    /// `focus left|right|up|down`
    Focus(Direction),
    /// `move left|right|up|down`
    Move(Direction),
    /// `resize ±Nx ±Ny`
    Resize(i32, i32),
    /// `float toggle`
    FloatToggle,
    /// `close`
    Close,
    /// `view ws <n>`
    View(usize),
    /// `send ws <n>`
    Send(usize),
    /// `move-ws <n> monitor <m>`
    MoveWs(usize, usize),
    /// `togglebar`
    ToggleBar,
    /// `fullscreen toggle`
    FullscreenToggle,
    /// `reload-config`
    ReloadConfig,
    /// `quit`
    Quit,
    /// `query windows|workspaces|monitors` (spec.md §11.5)
    Query(QueryTarget),
}

/// Parse one protocol line into a [Request] (spec.md §6).
pub fn parse_line(line: &str) -> Result<Request, ParseError> {
    let tokens = shell_words::split(line).map_err(|_| ParseError::Quoting(line.to_string()))?;
    let mut it = tokens.into_iter();
    let verb = it.next().ok_or_else(|| ParseError::UnknownVerb(String::new()))?;
    let args: Vec<String> = it.collect();

    match verb.as_str() {
        "set-workspaces" => parse_set_workspaces(&args),
        "bind" => parse_bind(&args),
        "rule" => parse_rule(&args),
        "scratch" => parse_scratch(&args),
        "set-gap" => parse_set_gap(&args),
        "set-border" => parse_set_border(&args),
        "set-color" => parse_set_color(&args),
        "bar" => parse_bar(&args),
        "spawn" => parse_spawn(&args),
        "focus" => parse_direction(&args, "focus").map(Request::Focus),
        "move" => parse_direction(&args, "move").map(Request::Move),
        "resize" => parse_resize(&args),
        "float" => expect_literal(&args, "float", "toggle").map(|_| Request::FloatToggle),
        "close" => Ok(Request::Close),
        "view" => parse_ws_arg(&args, "view").map(Request::View),
        "send" => parse_ws_arg(&args, "send").map(Request::Send),
        "move-ws" => parse_move_ws(&args),
        "togglebar" => Ok(Request::ToggleBar),
        "fullscreen" => expect_literal(&args, "fullscreen", "toggle").map(|_| Request::FullscreenToggle),
        "reload-config" => Ok(Request::ReloadConfig),
        "quit" => Ok(Request::Quit),
        "query" => parse_query(&args),
        other => Err(ParseError::UnknownVerb(other.to_string())),
    }
}

fn missing(verb: &str) -> ParseError {
    ParseError::MissingArgument { verb: verb.to_string() }
}

fn bad(verb: &str, text: &str) -> ParseError {
    ParseError::BadArgument {
        verb: verb.to_string(),
        text: text.to_string(),
    }
}

fn parse_set_workspaces(args: &[String]) -> Result<Request, ParseError> {
    if args.is_empty() {
        return Err(missing("set-workspaces"));
    }
    let specs = args
        .iter()
        .map(|tok| {
            let (idx, label) = tok.split_once(':').ok_or_else(|| bad("set-workspaces", tok))?;
            let idx: usize = idx.parse().map_err(|_| bad("set-workspaces", tok))?;
            Ok((idx, label.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Request::SetWorkspaces(specs))
}

fn parse_bind(args: &[String]) -> Result<Request, ParseError> {
    let [combo, command] = args else {
        return Err(missing("bind"));
    };
    let last = combo.rsplit('-').next().unwrap_or("");
    if matches!(last, "Button1" | "Button2" | "Button3") {
        Ok(Request::BindButton(MouseCombo::from_str(combo)?, command.clone()))
    } else {
        Ok(Request::BindKey(KeyCombo::from_str(combo)?, command.clone()))
    }
}

fn parse_kv_pairs<'a>(args: &'a [String]) -> Result<Vec<(&'a str, &'a str)>, ParseError> {
    args.iter()
        .map(|a| a.split_once('=').ok_or_else(|| ParseError::BadKeyValue(a.clone())))
        .collect()
}

fn parse_placement(pairs: &[(&str, &str)], verb: &str) -> Result<Placement, ParseError> {
    let mut placement = Placement::default();
    for (k, v) in pairs {
        match *k {
            "workspace" => placement.workspace = Some(v.parse().map_err(|_| bad(verb, v))?),
            "monitor" => placement.monitor = Some(v.parse().map_err(|_| bad(verb, v))?),
            "float" => placement.float = *v == "true",
            "area" => placement.area = Some(v.to_string()),
            "class" | "title" => {} // consumed separately by parse_rule
            other => return Err(ParseError::BadKeyValue(format!("{other}={v}"))),
        }
    }
    Ok(placement)
}

fn parse_rule(args: &[String]) -> Result<Request, ParseError> {
    let pairs = parse_kv_pairs(args)?;
    let class = pairs.iter().find(|(k, _)| *k == "class").map(|(_, v)| v.to_string());
    let title = pairs.iter().find(|(k, _)| *k == "title").map(|(_, v)| v.to_string());
    let placement = parse_placement(&pairs, "rule")?;
    Ok(Request::Rule(Rule::new(class, title, placement)))
}

fn parse_scratch(args: &[String]) -> Result<Request, ParseError> {
    if args.first().map(String::as_str) == Some("toggle") {
        let name = args.get(1).ok_or_else(|| missing("scratch"))?;
        return Ok(Request::ScratchToggle(name.clone()));
    }
    let tok = args.first().ok_or_else(|| missing("scratch"))?;
    let (name, cmd) = tok.split_once(':').ok_or_else(|| bad("scratch", tok))?;
    Ok(Request::ScratchRegister(name.to_string(), cmd.to_string()))
}

fn parse_set_gap(args: &[String]) -> Result<Request, ParseError> {
    let tok = args.first().ok_or_else(|| missing("set-gap"))?;
    let px: u32 = tok.parse().map_err(|_| bad("set-gap", tok))?;
    Ok(Request::SetGap(px))
}

fn parse_band(tok: &str, verb: &str) -> Result<BorderBand, ParseError> {
    match tok {
        "inner" => Ok(BorderBand::Inner),
        "outer" => Ok(BorderBand::Outer),
        _ => Err(bad(verb, tok)),
    }
}

fn parse_set_border(args: &[String]) -> Result<Request, ParseError> {
    let [band, px] = args else {
        return Err(missing("set-border"));
    };
    let band = parse_band(band, "set-border")?;
    let px: u32 = px.parse().map_err(|_| bad("set-border", px))?;
    Ok(Request::SetBorderWidth(band, px))
}

fn parse_set_color(args: &[String]) -> Result<Request, ParseError> {
    let [band, hex] = args else {
        return Err(missing("set-color"));
    };
    let band = parse_band(band, "set-color")?;
    let color = Color::try_from(hex.as_str()).map_err(|_| bad("set-color", hex))?;
    Ok(Request::SetBorderColor(band, color))
}

fn parse_bar(args: &[String]) -> Result<Request, ParseError> {
    let [flag, value] = args else {
        return Err(missing("bar"));
    };
    if flag != "show-occupied-only" {
        return Err(bad("bar", flag));
    }
    match value.as_str() {
        "true" => Ok(Request::SetBarShowOccupiedOnly(true)),
        "false" => Ok(Request::SetBarShowOccupiedOnly(false)),
        _ => Err(bad("bar", value)),
    }
}

fn parse_spawn(args: &[String]) -> Result<Request, ParseError> {
    let cmd = args.first().ok_or_else(|| missing("spawn"))?;
    let pairs = parse_kv_pairs(&args[1..])?;
    let placement = parse_placement(&pairs, "spawn")?;
    Ok(Request::Spawn(cmd.clone(), placement))
}

fn parse_direction(args: &[String], verb: &str) -> Result<Direction, ParseError> {
    let tok = args.first().ok_or_else(|| missing(verb))?;
    Direction::from_str(tok).map_err(|_| bad(verb, tok))
}

fn parse_resize(args: &[String]) -> Result<Request, ParseError> {
    let [dx, dy] = args else {
        return Err(missing("resize"));
    };
    Ok(Request::Resize(
        parse_signed_axis(dx, "resize", 'x')?,
        parse_signed_axis(dy, "resize", 'y')?,
    ))
}

fn parse_signed_axis(tok: &str, verb: &str, axis: char) -> Result<i32, ParseError> {
    let body = tok.strip_suffix(axis).ok_or_else(|| bad(verb, tok))?;
    body.parse().map_err(|_| bad(verb, tok))
}

fn expect_literal(args: &[String], verb: &str, expected: &str) -> Result<(), ParseError> {
    match args.first().map(String::as_str) {
        Some(tok) if tok == expected => Ok(()),
        Some(tok) => Err(bad(verb, tok)),
        None => Err(missing(verb)),
    }
}

fn parse_ws_arg(args: &[String], verb: &str) -> Result<usize, ParseError> {
    let [lit, n] = args else {
        return Err(missing(verb));
    };
    if lit != "ws" {
        return Err(bad(verb, lit));
    }
    n.parse().map_err(|_| bad(verb, n))
}

fn parse_move_ws(args: &[String]) -> Result<Request, ParseError> {
    let [n, lit, m] = args else {
        return Err(missing("move-ws"));
    };
    if lit != "monitor" {
        return Err(bad("move-ws", lit));
    }
    let n: usize = n.parse().map_err(|_| bad("move-ws", n))?;
    let m: usize = m.parse().map_err(|_| bad("move-ws", m))?;
    Ok(Request::MoveWs(n, m))
}

fn parse_query(args: &[String]) -> Result<Request, ParseError> {
    let tok = args.first().ok_or_else(|| missing("query"))?;
    let target = match tok.as_str() {
        "windows" => QueryTarget::Windows,
        "workspaces" => QueryTarget::Workspaces,
        "monitors" => QueryTarget::Monitors,
        _ => return Err(bad("query", tok)),
    };
    Ok(Request::Query(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test]
    fn parses_set_workspaces() {
        let req = parse_line("set-workspaces 1:dev 2:web").unwrap();
        assert_eq!(
            req,
            Request::SetWorkspaces(vec![(1, "dev".into()), (2, "web".into())])
        );
    }

    #[test]
    fn parses_key_bind() {
        let req = parse_line("bind Mod4-Return \"spawn alacritty\"").unwrap();
        assert_eq!(
            req,
            Request::BindKey(
                KeyCombo::from_str("Mod4-Return").unwrap(),
                "spawn alacritty".into()
            )
        );
    }

    #[test]
    fn parses_button_bind() {
        let req = parse_line("bind Mod4-Button1 move").unwrap();
        assert!(matches!(req, Request::BindButton(_, _)));
    }

    #[test]
    fn parses_rule_with_overrides() {
        let req = parse_line("rule class=Firefox workspace=2 float=true").unwrap();
        let Request::Rule(rule) = req else { panic!("wrong variant") };
        assert_eq!(rule, Rule::new(Some("Firefox".into()), None, Placement {
            workspace: Some(2),
            float: true,
            ..Default::default()
        }));
    }

    #[test]
    fn parses_scratch_register_and_toggle() {
        assert_eq!(
            parse_line("scratch term:alacritty").unwrap(),
            Request::ScratchRegister("term".into(), "alacritty".into())
        );
        assert_eq!(
            parse_line("scratch toggle term").unwrap(),
            Request::ScratchToggle("term".into())
        );
    }

    #[test_case("resize +10x -5y", Request::Resize(10, -5); "mixed signs")]
    #[test_case("resize -20x +20y", Request::Resize(-20, 20); "both signs")]
    #[test]
    fn parses_resize(line: &str, expected: Request) {
        assert_eq!(parse_line(line).unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_verb() {
        assert!(matches!(parse_line("frobnicate"), Err(ParseError::UnknownVerb(_))));
    }

    #[test]
    fn rejects_missing_argument() {
        assert!(matches!(parse_line("set-gap"), Err(ParseError::MissingArgument { .. })));
    }

    #[test]
    fn parses_view_and_move_ws() {
        assert_eq!(parse_line("view ws 2").unwrap(), Request::View(2));
        assert_eq!(parse_line("move-ws 2 monitor 1").unwrap(), Request::MoveWs(2, 1));
    }

    #[test]
    fn parses_query() {
        assert_eq!(
            parse_line("query windows").unwrap(),
            Request::Query(QueryTarget::Windows)
        );
    }

    #[test]
    fn unterminated_quote_is_quoting_error() {
        assert!(matches!(parse_line("bind Mod4-q \"unterminated"), Err(ParseError::Quoting(_))));
    }
}
