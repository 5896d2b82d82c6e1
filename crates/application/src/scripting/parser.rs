//! Parser for the pm-style script surface.
//!
//! Recognizes the statement forms the adapter exposes and turns them
//! into domain [`ScriptCommand`]s. Anything outside that surface is a
//! parse error, which for a pre-request script aborts the send.

use courier_domain::{Expr, ScriptCommand, ScriptError, SubRequestSpec, VariableScope};

/// Parses a script source into a command list.
///
/// # Errors
///
/// Returns [`ScriptError::Parse`] with the offending line on any
/// statement outside the supported surface.
pub fn parse(source: &str) -> Result<Vec<ScriptCommand>, ScriptError> {
    let mut cursor = Cursor::new(source);
    let commands = parse_statements(&mut cursor)?;
    cursor.skip_trivia();
    if cursor.eof() {
        Ok(commands)
    } else {
        Err(cursor.error("unexpected trailing input"))
    }
}

fn parse_statements(cursor: &mut Cursor) -> Result<Vec<ScriptCommand>, ScriptError> {
    let mut commands = Vec::new();
    loop {
        cursor.skip_trivia();
        if cursor.eof() || cursor.peek() == Some('}') {
            return Ok(commands);
        }
        if let Some(command) = parse_statement(cursor)? {
            commands.push(command);
        }
    }
}

fn parse_statement(cursor: &mut Cursor) -> Result<Option<ScriptCommand>, ScriptError> {
    let path = parse_path(cursor)?;
    let segments: Vec<&str> = path.iter().map(String::as_str).collect();
    cursor.skip_trivia();

    match segments.as_slice() {
        ["console", "log"] => {
            let args = parse_expr_args(cursor)?;
            Ok(Some(ScriptCommand::Log(args)))
        }
        ["pm", scope @ ("environment" | "globals" | "collectionVariables" | "variables"), action] => {
            parse_scope_statement(cursor, scope, action)
        }
        ["pm", "request", "url"] => {
            cursor.expect('=')?;
            let value = parse_expr(cursor)?;
            Ok(Some(ScriptCommand::SetUrl(value)))
        }
        ["pm", "request", "method"] => {
            cursor.expect('=')?;
            let value = parse_expr(cursor)?;
            Ok(Some(ScriptCommand::SetMethod(value)))
        }
        ["pm", "request", "headers", action @ ("add" | "set" | "upsert" | "remove")] => {
            parse_header_statement(cursor, action).map(Some)
        }
        ["pm", "request", "body", "setRaw"] => {
            let mut args = parse_expr_args(cursor)?;
            if args.len() == 1 {
                Ok(Some(ScriptCommand::SetBody(args.remove(0))))
            } else {
                Err(cursor.error("setRaw expects one argument"))
            }
        }
        ["pm", "response", "setBody"] => {
            let mut args = parse_expr_args(cursor)?;
            if args.len() == 1 {
                Ok(Some(ScriptCommand::SetResponseBody(args.remove(0))))
            } else {
                Err(cursor.error("setBody expects one argument"))
            }
        }
        ["pm", "sendRequest"] => parse_send_request(cursor).map(Some),
        ["pm", "test"] => parse_test(cursor).map(Some),
        ["pm", "expect"] => parse_expect(cursor).map(Some),
        _ => Err(cursor.error(&format!("unsupported statement: {}", path.join(".")))),
    }
}

fn parse_scope_statement(
    cursor: &mut Cursor,
    scope: &str,
    action: &str,
) -> Result<Option<ScriptCommand>, ScriptError> {
    // `pm.variables` is the alias scope: reads hit the flattened map,
    // writes land in the active environment.
    let target = match scope {
        "environment" | "variables" => VariableScope::Environment,
        "globals" => VariableScope::Global,
        "collectionVariables" => VariableScope::Collection,
        _ => return Err(cursor.error(&format!("unknown scope: {scope}"))),
    };

    match action {
        "set" => {
            cursor.expect('(')?;
            let key = cursor.parse_string()?;
            cursor.expect(',')?;
            let value = parse_expr(cursor)?;
            cursor.expect(')')?;
            Ok(Some(ScriptCommand::SetVariable {
                scope: target,
                key,
                value,
            }))
        }
        "unset" => {
            cursor.expect('(')?;
            let key = cursor.parse_string()?;
            cursor.expect(')')?;
            Ok(Some(ScriptCommand::UnsetVariable { scope: target, key }))
        }
        // A bare `get` statement has no effect.
        "get" => {
            cursor.expect('(')?;
            cursor.parse_string()?;
            cursor.expect(')')?;
            Ok(None)
        }
        other => Err(cursor.error(&format!("unsupported scope action: {other}"))),
    }
}

fn parse_header_statement(cursor: &mut Cursor, action: &str) -> Result<ScriptCommand, ScriptError> {
    cursor.expect('(')?;
    cursor.skip_trivia();

    let (name, value) = if cursor.peek() == Some('{') {
        parse_header_object(cursor)?
    } else {
        let name = cursor.parse_string()?;
        if action == "remove" {
            cursor.expect(')')?;
            return Ok(ScriptCommand::RemoveHeader { name });
        }
        cursor.expect(',')?;
        let value = parse_expr(cursor)?;
        (name, value)
    };

    cursor.expect(')')?;
    match action {
        "add" => Ok(ScriptCommand::AddHeader { name, value }),
        "set" | "upsert" => Ok(ScriptCommand::SetHeader { name, value }),
        "remove" => Ok(ScriptCommand::RemoveHeader { name }),
        _ => Err(cursor.error(&format!("unknown header action: {action}"))),
    }
}

/// Parses the `{ key: "Name", value: expr }` header object form.
fn parse_header_object(cursor: &mut Cursor) -> Result<(String, Expr), ScriptError> {
    cursor.expect('{')?;
    let mut name = None;
    let mut value = None;

    loop {
        cursor.skip_trivia();
        if cursor.peek() == Some('}') {
            cursor.bump();
            break;
        }
        let field = cursor.parse_key()?;
        cursor.expect(':')?;
        match field.as_str() {
            "key" | "name" => name = Some(cursor.parse_string()?),
            "value" => value = Some(parse_expr(cursor)?),
            _ => skip_value(cursor)?,
        }
        cursor.skip_trivia();
        if cursor.peek() == Some(',') {
            cursor.bump();
        }
    }

    match (name, value) {
        (Some(name), Some(value)) => Ok((name, value)),
        _ => Err(cursor.error("header object needs key and value fields")),
    }
}

#[allow(clippy::too_many_lines)]
fn parse_send_request(cursor: &mut Cursor) -> Result<ScriptCommand, ScriptError> {
    cursor.expect('(')?;
    cursor.skip_trivia();

    let spec = if cursor.peek() == Some('{') {
        parse_request_spec(cursor)?
    } else {
        SubRequestSpec {
            url: parse_expr(cursor)?,
            method: None,
            headers: Vec::new(),
            body: None,
            body_is_json: false,
        }
    };

    cursor.skip_trivia();
    let callback = if cursor.peek() == Some(',') {
        cursor.bump();
        parse_callback(cursor)?
    } else {
        Vec::new()
    };

    cursor.expect(')')?;
    Ok(ScriptCommand::SendRequest { spec, callback })
}

fn parse_request_spec(cursor: &mut Cursor) -> Result<SubRequestSpec, ScriptError> {
    cursor.expect('{')?;
    let mut url = None;
    let mut method = None;
    let mut headers = Vec::new();
    let mut body = None;
    let mut body_is_json = false;

    loop {
        cursor.skip_trivia();
        if cursor.peek() == Some('}') {
            cursor.bump();
            break;
        }
        let field = cursor.parse_key()?;
        cursor.expect(':')?;
        cursor.skip_trivia();
        match field.as_str() {
            "url" => url = Some(parse_expr(cursor)?),
            "method" => method = Some(cursor.parse_string()?),
            "header" | "headers" => headers = parse_header_map(cursor)?,
            "body" => {
                if cursor.peek() == Some('{') {
                    // A bare object body is kept as raw JSON text and
                    // defaults the content type downstream.
                    body = Some(Expr::Str(capture_balanced(cursor)?));
                    body_is_json = true;
                } else {
                    body = Some(parse_expr(cursor)?);
                }
            }
            _ => skip_value(cursor)?,
        }
        cursor.skip_trivia();
        if cursor.peek() == Some(',') {
            cursor.bump();
        }
    }

    url.map_or_else(
        || Err(cursor.error("sendRequest spec needs a url field")),
        |url| {
            Ok(SubRequestSpec {
                url,
                method,
                headers,
                body,
                body_is_json,
            })
        },
    )
}

fn parse_header_map(cursor: &mut Cursor) -> Result<Vec<(String, Expr)>, ScriptError> {
    cursor.expect('{')?;
    let mut headers = Vec::new();
    loop {
        cursor.skip_trivia();
        if cursor.peek() == Some('}') {
            cursor.bump();
            return Ok(headers);
        }
        let name = cursor.parse_key()?;
        cursor.expect(':')?;
        let value = parse_expr(cursor)?;
        headers.push((name, value));
        cursor.skip_trivia();
        if cursor.peek() == Some(',') {
            cursor.bump();
        }
    }
}

fn parse_test(cursor: &mut Cursor) -> Result<ScriptCommand, ScriptError> {
    cursor.expect('(')?;
    let name = cursor.parse_string()?;
    cursor.expect(',')?;
    let body = parse_callback(cursor)?;
    cursor.expect(')')?;
    Ok(ScriptCommand::Test { name, body })
}

fn parse_expect(cursor: &mut Cursor) -> Result<ScriptCommand, ScriptError> {
    cursor.expect('(')?;
    let actual = parse_expr(cursor)?;
    cursor.expect(')')?;
    cursor.expect('.')?;
    let to = cursor.parse_ident()?;
    if to != "to" {
        return Err(cursor.error("expected .to after pm.expect(...)"));
    }
    cursor.expect('.')?;
    let comparison = cursor.parse_ident()?;
    let negated = match comparison.as_str() {
        "equal" | "eql" => false,
        "notEqual" => true,
        other => return Err(cursor.error(&format!("unsupported assertion: {other}"))),
    };
    cursor.expect('(')?;
    let expected = parse_expr(cursor)?;
    cursor.expect(')')?;
    Ok(ScriptCommand::Expect {
        actual,
        expected,
        negated,
    })
}

/// Parses a `function (…) { … }` or `(…) => { … }` callback body into
/// nested commands. Parameter names are ignored; inside the block the
/// bound response is addressed as `res`.
fn parse_callback(cursor: &mut Cursor) -> Result<Vec<ScriptCommand>, ScriptError> {
    cursor.skip_trivia();

    if cursor.peek_keyword("function") {
        cursor.consume_ident();
        cursor.skip_trivia();
    }
    cursor.expect('(')?;
    while let Some(ch) = cursor.peek() {
        if ch == ')' {
            break;
        }
        cursor.bump();
    }
    cursor.expect(')')?;
    cursor.skip_trivia();
    if cursor.peek() == Some('=') {
        cursor.bump();
        cursor.expect('>')?;
    }
    cursor.expect('{')?;
    let body = parse_statements(cursor)?;
    cursor.expect('}')?;
    Ok(body)
}

fn parse_expr_args(cursor: &mut Cursor) -> Result<Vec<Expr>, ScriptError> {
    cursor.expect('(')?;
    let mut args = Vec::new();
    loop {
        cursor.skip_trivia();
        if cursor.peek() == Some(')') {
            cursor.bump();
            return Ok(args);
        }
        args.push(parse_expr(cursor)?);
        cursor.skip_trivia();
        if cursor.peek() == Some(',') {
            cursor.bump();
        }
    }
}

fn parse_expr(cursor: &mut Cursor) -> Result<Expr, ScriptError> {
    let mut parts = vec![parse_primary(cursor)?];
    loop {
        cursor.skip_trivia();
        if cursor.peek() == Some('+') {
            cursor.bump();
            parts.push(parse_primary(cursor)?);
        } else {
            break;
        }
    }
    Ok(if parts.len() == 1 {
        parts.swap_remove(0)
    } else {
        Expr::Concat(parts)
    })
}

fn parse_primary(cursor: &mut Cursor) -> Result<Expr, ScriptError> {
    cursor.skip_trivia();
    match cursor.peek() {
        Some('"' | '\'') => Ok(Expr::Str(cursor.parse_string()?)),
        Some(ch) if ch.is_ascii_digit() => {
            let mut literal = String::new();
            while let Some(ch) = cursor.peek() {
                if ch.is_ascii_digit() || ch == '.' {
                    literal.push(ch);
                    cursor.bump();
                } else {
                    break;
                }
            }
            Ok(Expr::Str(literal))
        }
        Some(ch) if is_ident_start(ch) => parse_path_expr(cursor),
        _ => Err(cursor.error("expected an expression")),
    }
}

fn parse_path_expr(cursor: &mut Cursor) -> Result<Expr, ScriptError> {
    let path = parse_path(cursor)?;
    let segments: Vec<&str> = path.iter().map(String::as_str).collect();

    match segments.as_slice() {
        ["pm", "request", "url"] => Ok(Expr::RequestUrl),
        ["pm", "request", "method"] => Ok(Expr::RequestMethod),
        ["pm", "request", "body", "raw"] => {
            cursor.expect('(')?;
            cursor.expect(')')?;
            Ok(Expr::RequestBody)
        }
        ["pm", "request", "headers", "get"] => {
            cursor.expect('(')?;
            let name = cursor.parse_string()?;
            cursor.expect(')')?;
            Ok(Expr::RequestHeader(name))
        }
        ["pm", "request", "headers", "toJSON"] => {
            cursor.expect('(')?;
            cursor.expect(')')?;
            Ok(Expr::RequestHeadersJson)
        }
        ["pm", "environment", "get"] => parse_get(cursor, Some(VariableScope::Environment)),
        ["pm", "globals", "get"] => parse_get(cursor, Some(VariableScope::Global)),
        ["pm", "collectionVariables", "get"] => parse_get(cursor, Some(VariableScope::Collection)),
        ["pm", "variables", "get"] => parse_get(cursor, None),
        ["pm", "response", "code"] | ["res", "code"] | ["res", "status"] => Ok(Expr::ResponseCode),
        ["pm", "response", "text"] | ["res", "text"] => {
            cursor.expect('(')?;
            cursor.expect(')')?;
            Ok(Expr::ResponseText)
        }
        ["pm", "response", "json"] | ["res", "json"] => {
            cursor.expect('(')?;
            cursor.expect(')')?;
            let mut json_path = Vec::new();
            loop {
                cursor.skip_trivia();
                if cursor.peek() == Some('.') {
                    cursor.bump();
                    cursor.skip_trivia();
                    json_path.push(cursor.parse_ident()?);
                } else {
                    break;
                }
            }
            Ok(Expr::ResponseJsonPath(json_path))
        }
        ["true"] => Ok(Expr::Str("true".to_string())),
        ["false"] => Ok(Expr::Str("false".to_string())),
        _ => Err(cursor.error(&format!("unsupported expression: {}", path.join(".")))),
    }
}

fn parse_get(cursor: &mut Cursor, scope: Option<VariableScope>) -> Result<Expr, ScriptError> {
    cursor.expect('(')?;
    let key = cursor.parse_string()?;
    cursor.expect(')')?;
    Ok(Expr::GetVariable { scope, key })
}

fn parse_path(cursor: &mut Cursor) -> Result<Vec<String>, ScriptError> {
    cursor.skip_trivia();
    let mut segments = vec![cursor.parse_ident()?];
    loop {
        let mark = cursor.pos;
        cursor.skip_trivia();
        if cursor.peek() == Some('.') {
            cursor.bump();
            cursor.skip_trivia();
            segments.push(cursor.parse_ident()?);
        } else {
            cursor.pos = mark;
            return Ok(segments);
        }
    }
}

/// Skips one object value of arbitrary shape (for unknown spec fields):
/// strings, nested braces/brackets/parens, bare literals.
fn skip_value(cursor: &mut Cursor) -> Result<(), ScriptError> {
    cursor.skip_trivia();
    let mut depth = 0_i32;
    loop {
        match cursor.peek() {
            None => return Ok(()),
            Some('"' | '\'') => {
                cursor.parse_string()?;
            }
            Some('{' | '[' | '(') => {
                depth += 1;
                cursor.bump();
            }
            Some('}' | ']' | ')') => {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
                cursor.bump();
            }
            Some(',') if depth == 0 => return Ok(()),
            Some(_) => {
                cursor.bump();
            }
        }
    }
}

/// Captures a balanced `{…}` block verbatim, string-aware.
fn capture_balanced(cursor: &mut Cursor) -> Result<String, ScriptError> {
    cursor.skip_trivia();
    if cursor.peek() != Some('{') {
        return Err(cursor.error("expected '{'"));
    }
    let mut raw = String::new();
    let mut depth = 0_i32;
    loop {
        match cursor.peek() {
            None => return Err(cursor.error("unterminated object literal")),
            Some(ch @ ('"' | '\'')) => {
                let literal = cursor.parse_string()?;
                raw.push(ch);
                raw.push_str(&literal);
                raw.push(ch);
            }
            Some(ch) => {
                cursor.bump();
                raw.push(ch);
                if ch == '{' {
                    depth += 1;
                } else if ch == '}' {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(raw);
                    }
                }
            }
        }
    }
}

const fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

const fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn line(&self) -> usize {
        1 + self.chars[..self.pos.min(self.chars.len())]
            .iter()
            .filter(|&&c| c == '\n')
            .count()
    }

    fn error(&self, message: &str) -> ScriptError {
        ScriptError::Parse {
            line: self.line(),
            message: message.to_string(),
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() || ch == ';' => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(ch) = self.bump() {
                        if ch == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.bump();
                    self.bump();
                    while let Some(ch) = self.bump() {
                        if ch == '*' && self.peek() == Some('/') {
                            self.bump();
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ScriptError> {
        self.skip_trivia();
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{expected}'")))
        }
    }

    fn parse_ident(&mut self) -> Result<String, ScriptError> {
        self.skip_trivia();
        let mut ident = String::new();
        match self.peek() {
            Some(ch) if is_ident_start(ch) => {
                ident.push(ch);
                self.bump();
            }
            _ => return Err(self.error("expected an identifier")),
        }
        while let Some(ch) = self.peek() {
            if is_ident_char(ch) {
                ident.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        Ok(ident)
    }

    /// An object key: identifier or quoted string.
    fn parse_key(&mut self) -> Result<String, ScriptError> {
        self.skip_trivia();
        match self.peek() {
            Some('"' | '\'') => self.parse_string(),
            _ => self.parse_ident(),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let mut offset = 0;
        for expected in keyword.chars() {
            if self.peek_at(offset) != Some(expected) {
                return false;
            }
            offset += 1;
        }
        !self.peek_at(offset).is_some_and(is_ident_char)
    }

    fn consume_ident(&mut self) {
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
    }

    fn parse_string(&mut self) -> Result<String, ScriptError> {
        self.skip_trivia();
        let quote = match self.peek() {
            Some(ch @ ('"' | '\'')) => ch,
            _ => return Err(self.error("expected a string literal")),
        };
        self.bump();

        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some(ch) => value.push(ch),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(ch) if ch == quote => return Ok(value),
                Some(ch) => value.push(ch),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_environment_set() {
        let commands = parse(r#"pm.environment.set("token", "abc")"#).unwrap();
        assert_eq!(
            commands,
            vec![ScriptCommand::SetVariable {
                scope: VariableScope::Environment,
                key: "token".to_string(),
                value: Expr::str("abc"),
            }]
        );
    }

    #[test]
    fn test_variables_set_aliases_environment() {
        let commands = parse(r#"pm.variables.set('id', '42')"#).unwrap();
        assert_eq!(
            commands,
            vec![ScriptCommand::SetVariable {
                scope: VariableScope::Environment,
                key: "id".to_string(),
                value: Expr::str("42"),
            }]
        );
    }

    #[test]
    fn test_parse_globals_unset() {
        let commands = parse(r#"pm.globals.unset("stale")"#).unwrap();
        assert_eq!(
            commands,
            vec![ScriptCommand::UnsetVariable {
                scope: VariableScope::Global,
                key: "stale".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_url_assignment_with_concat() {
        let commands = parse(r#"pm.request.url = pm.request.url + "?id={{id}}""#).unwrap();
        assert_eq!(
            commands,
            vec![ScriptCommand::SetUrl(Expr::Concat(vec![
                Expr::RequestUrl,
                Expr::str("?id={{id}}"),
            ]))]
        );
    }

    #[test]
    fn test_parse_header_forms() {
        let commands = parse(
            r#"
            pm.request.headers.upsert("X-Trace", "1")
            pm.request.headers.add({ key: "X-Extra", value: "2" })
            pm.request.headers.remove("X-Stale")
            "#,
        )
        .unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands[0],
            ScriptCommand::SetHeader {
                name: "X-Trace".to_string(),
                value: Expr::str("1"),
            }
        );
        assert_eq!(
            commands[1],
            ScriptCommand::AddHeader {
                name: "X-Extra".to_string(),
                value: Expr::str("2"),
            }
        );
        assert_eq!(
            commands[2],
            ScriptCommand::RemoveHeader {
                name: "X-Stale".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_body_raw_read() {
        let commands = parse(r#"pm.environment.set("sent", pm.request.body.raw())"#).unwrap();
        assert_eq!(
            commands,
            vec![ScriptCommand::SetVariable {
                scope: VariableScope::Environment,
                key: "sent".to_string(),
                value: Expr::RequestBody,
            }]
        );
    }

    #[test]
    fn test_parse_header_reads() {
        let commands = parse(
            r#"console.log(pm.request.headers.get("Accept"), pm.request.headers.toJSON())"#,
        )
        .unwrap();
        assert_eq!(
            commands,
            vec![ScriptCommand::Log(vec![
                Expr::RequestHeader("Accept".to_string()),
                Expr::RequestHeadersJson,
            ])]
        );
    }

    #[test]
    fn test_parse_console_log_with_comments() {
        let commands = parse(
            r#"
            // prime the run
            console.log("before", pm.environment.get("host"));
            /* block comment */
            "#,
        )
        .unwrap();
        assert_eq!(
            commands,
            vec![ScriptCommand::Log(vec![
                Expr::str("before"),
                Expr::GetVariable {
                    scope: Some(VariableScope::Environment),
                    key: "host".to_string(),
                },
            ])]
        );
    }

    #[test]
    fn test_parse_send_request_with_callback() {
        let source = r#"
            pm.sendRequest({
                url: "{{base}}/auth",
                method: "POST",
                header: { "X-Api": "1" },
                body: { "grant": "client" }
            }, function (err, res) {
                pm.environment.set("token", res.json().access_token);
            });
        "#;
        let commands = parse(source).unwrap();
        assert_eq!(commands.len(), 1);
        let ScriptCommand::SendRequest { spec, callback } = &commands[0] else {
            panic!("expected SendRequest");
        };
        assert_eq!(spec.method.as_deref(), Some("POST"));
        assert!(spec.body_is_json);
        assert_eq!(spec.headers.len(), 1);
        assert_eq!(callback.len(), 1);
        assert_eq!(
            callback[0],
            ScriptCommand::SetVariable {
                scope: VariableScope::Environment,
                key: "token".to_string(),
                value: Expr::ResponseJsonPath(vec!["access_token".to_string()]),
            }
        );
    }

    #[test]
    fn test_parse_send_request_url_only() {
        let commands = parse(r#"pm.sendRequest("https://example.com/ping")"#).unwrap();
        let ScriptCommand::SendRequest { spec, callback } = &commands[0] else {
            panic!("expected SendRequest");
        };
        assert_eq!(spec.url, Expr::str("https://example.com/ping"));
        assert!(callback.is_empty());
    }

    #[test]
    fn test_parse_test_with_expect() {
        let source = r#"
            pm.test("status is ok", function () {
                pm.expect(res.code).to.equal(200);
            });
        "#;
        let commands = parse(source).unwrap();
        let ScriptCommand::Test { name, body } = &commands[0] else {
            panic!("expected Test");
        };
        assert_eq!(name, "status is ok");
        assert_eq!(
            body[0],
            ScriptCommand::Expect {
                actual: Expr::ResponseCode,
                expected: Expr::str("200"),
                negated: false,
            }
        );
    }

    #[test]
    fn test_parse_arrow_callback() {
        let source = r#"pm.test("t", () => { console.log("in"); })"#;
        let commands = parse(source).unwrap();
        let ScriptCommand::Test { body, .. } = &commands[0] else {
            panic!("expected Test");
        };
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_parse_response_body_rewrite() {
        let commands = parse(r#"pm.response.setBody(res.text() + "!")"#).unwrap();
        assert_eq!(
            commands,
            vec![ScriptCommand::SetResponseBody(Expr::Concat(vec![
                Expr::ResponseText,
                Expr::str("!"),
            ]))]
        );
    }

    #[test]
    fn test_unknown_statement_is_a_parse_error() {
        let result = parse("window.alert('hi')");
        assert!(matches!(result, Err(ScriptError::Parse { .. })));
    }

    #[test]
    fn test_error_carries_line_number() {
        let result = parse("console.log(\"ok\")\nnot_a_thing()");
        let Err(ScriptError::Parse { line, .. }) = result else {
            panic!("expected parse error");
        };
        assert_eq!(line, 2);
    }

    #[test]
    fn test_empty_source_parses_to_nothing() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  // only a comment\n").unwrap().is_empty());
    }
}
