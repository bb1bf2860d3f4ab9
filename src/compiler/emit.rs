//! C emission for a minimized machine
//!
//! The body follows the classic llparse layout: one `run` function holding a
//! switch whose cases double as goto labels, so any state can be resumed from
//! `state->_current` and jumped to directly while input remains.

use super::lower::{Jump, Machine, StateId, StateKind};
use super::CompileOptions;
use crate::grammar::{Code, Grammar, PropertyType, Transform};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Single states with at least this many plain edges use a lookup table.
const TABLE_THRESHOLD: usize = 8;

struct Out {
    text: String,
    indent: usize,
}

impl Out {
    fn new() -> Self {
        Out {
            text: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, s: impl AsRef<str>) {
        let s = s.as_ref();
        if !s.is_empty() {
            for _ in 0..self.indent {
                self.text.push_str("  ");
            }
            self.text.push_str(s);
        }
        self.text.push('\n');
    }

    fn blank(&mut self) {
        self.text.push('\n');
    }

    fn open(&mut self, s: impl AsRef<str>) {
        self.line(s);
        self.indent += 1;
    }

    fn close(&mut self, s: impl AsRef<str>) {
        self.indent = self.indent.saturating_sub(1);
        self.line(s);
    }
}

/// The header fragment: state struct and entry point prototypes.
pub(crate) fn header(grammar: &Grammar, options: &CompileOptions) -> String {
    let prefix = grammar.prefix();
    let mut out = Out::new();

    out.line(format!("#ifndef {}", options.header_guard));
    out.line(format!("#define {}", options.header_guard));
    out.line("#ifdef __cplusplus");
    out.line("extern \"C\" {");
    out.line("#endif");
    out.blank();
    out.line("#include <stdint.h>");
    out.blank();
    out.line(format!("typedef struct {p}_s {p}_t;", p = prefix));
    out.open(format!("struct {}_s {{", prefix));
    out.line("int32_t _index;");
    for i in 0..grammar.spans().len() {
        out.line(format!("void* _span_pos{};", i));
    }
    out.line("int32_t error;");
    out.line("const char* reason;");
    out.line("const char* error_pos;");
    out.line("void* data;");
    out.line("void* _current;");
    for property in grammar.properties() {
        out.line(format!("{} {};", property.ty.c_type(), property.name));
    }
    out.close("};");
    out.blank();
    out.line(format!("int {p}_init({p}_t* s);", p = prefix));
    out.line(format!(
        "int {p}_execute({p}_t* s, const char* p, const char* endp);",
        p = prefix
    ));
    out.blank();
    out.line("#ifdef __cplusplus");
    out.line("}  /* extern \"C\" */");
    out.line("#endif");
    out.line(format!("#endif  /* {} */", options.header_guard));
    out.text
}

struct Names {
    states: Vec<String>,
    codes: HashMap<Code, String>,
    blobs: Vec<Vec<u8>>,
}

impl Names {
    fn new(grammar: &Grammar, machine: &Machine) -> Self {
        let prefix = grammar.prefix();
        let mut used = HashSet::new();
        let states = machine
            .states
            .iter()
            .map(|s| unique(&mut used, format!("s_n_{}__n_{}", prefix, sanitize(&s.name))))
            .collect();

        let mut used = HashSet::new();
        let mut codes = HashMap::new();
        let mut blobs: Vec<Vec<u8>> = Vec::new();
        for state in &machine.states {
            match &state.kind {
                StateKind::Invoke { code, .. } if !codes.contains_key(code) => {
                    let name = if code.is_external() {
                        code.helper_name()
                    } else {
                        unique(&mut used, format!("{}__{}", prefix, code.helper_name()))
                    };
                    codes.insert(code.clone(), name);
                }
                StateKind::Sequence { bytes, .. } if !blobs.contains(bytes) => {
                    blobs.push(bytes.clone());
                }
                _ => {}
            }
        }

        Names { states, codes, blobs }
    }

    fn state(&self, id: StateId) -> &str {
        &self.states[id]
    }

    fn blob(&self, bytes: &[u8]) -> usize {
        self.blobs.iter().position(|b| b == bytes).unwrap_or(0)
    }
}

fn unique(used: &mut HashSet<String>, base: String) -> String {
    let mut name = base.clone();
    let mut n = 0;
    while used.contains(&name) {
        n += 1;
        name = format!("{}_{}", base, n);
    }
    used.insert(name.clone());
    name
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn c_char(byte: u8) -> String {
    match byte {
        b'\'' => "'\\''".to_string(),
        b'\\' => "'\\\\'".to_string(),
        0x20..=0x7e => format!("'{}'", byte as char),
        _ => byte.to_string(),
    }
}

fn c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn max_literal(max: u64) -> String {
    format!("0x{:x}ULL", max)
}

/// The C body implementing the machine.
pub(crate) fn body(grammar: &Grammar, machine: &Machine, options: &CompileOptions) -> String {
    let prefix = grammar.prefix();
    let names = Names::new(grammar, machine);
    let mut out = Out::new();

    out.line("#include <stdlib.h>");
    out.line("#include <stdint.h>");
    out.line("#include <string.h>");
    out.blank();
    out.line(format!("#include \"{}.h\"", options.header_name));
    out.blank();

    for (i, blob) in names.blobs.iter().enumerate() {
        out.open(format!("static const unsigned char llparse_blob{}[] = {{", i));
        let bytes: Vec<String> = blob.iter().map(|b| c_char(*b)).collect();
        out.line(bytes.join(", "));
        out.close("};");
    }
    if !names.blobs.is_empty() {
        out.blank();
        emit_match_helpers(&mut out, prefix, machine);
    }

    out.open("enum llparse_state_e {");
    out.line("s_error,");
    for name in &names.states {
        out.line(format!("{},", name));
    }
    out.close("};");
    out.line("typedef enum llparse_state_e llparse_state_t;");
    out.blank();

    let mut externals = BTreeSet::new();
    for span in grammar.spans() {
        externals.insert(span.callback.clone());
    }
    for code in names.codes.keys() {
        if let Code::Match(name) = code {
            externals.insert(name.clone());
        }
    }
    for name in &externals {
        out.line(format!(
            "int {}({}_t* s, const unsigned char* p, const unsigned char* endp);",
            name, prefix
        ));
        out.blank();
    }
    if let Some(debug) = &options.debug {
        out.line(format!(
            "void {}({}_t* s, const char* p, const char* endp,",
            debug, prefix
        ));
        out.line("    const char* msg);");
        out.blank();
    }

    let mut helpers: Vec<(&Code, &String)> = names.codes.iter().filter(|(c, _)| !c.is_external()).collect();
    helpers.sort_by(|a, b| a.1.cmp(b.1));
    for (code, name) in helpers {
        emit_code(&mut out, grammar, code, name);
    }

    out.open(format!("int {p}_init({p}_t* state) {{", p = prefix));
    out.line("memset(state, 0, sizeof(*state));");
    out.line(format!(
        "state->_current = (void*) (intptr_t) {};",
        names.state(machine.entry)
    ));
    out.line("return 0;");
    out.close("}");
    out.blank();

    out.open(format!(
        "static llparse_state_t {p}__run({p}_t* state, const unsigned char* p, const unsigned char* endp) {{",
        p = prefix
    ));
    out.line("int match;");
    out.open("switch ((llparse_state_t) (intptr_t) state->_current) {");
    for (id, state) in machine.states.iter().enumerate() {
        let label = names.state(id).to_string();
        out.line(format!("case {}:", label));
        out.open(format!("{}: {{", label));
        emit_state(&mut out, grammar, &names, options, id, &state.name, &state.kind);
        out.close("}");
    }
    out.line("default:");
    out.line("  /* UNREACHABLE */");
    out.line("  abort();");
    out.close("}");
    out.close("}");
    out.blank();

    emit_execute(&mut out, grammar);
    out.text
}

fn emit_match_helpers(out: &mut Out, prefix: &str, machine: &Machine) {
    out.open("enum llparse_match_status_e {");
    out.line("kMatchComplete,");
    out.line("kMatchPause,");
    out.line("kMatchMismatch");
    out.close("};");
    out.line("typedef enum llparse_match_status_e llparse_match_status_t;");
    out.blank();
    out.open("struct llparse_match_s {");
    out.line("llparse_match_status_t status;");
    out.line("const unsigned char* current;");
    out.close("};");
    out.line("typedef struct llparse_match_s llparse_match_t;");
    out.blank();

    let mut variants = BTreeSet::new();
    for state in &machine.states {
        if let StateKind::Sequence { transform, .. } = &state.kind {
            variants.insert(transform.is_some());
        }
    }
    for lower in variants {
        let (suffix, read) = if lower {
            ("to_lower_unsafe", "((*p) | 0x20)")
        } else {
            ("id", "*p")
        };
        out.line(format!(
            "static llparse_match_t llparse__match_sequence_{}(",
            suffix
        ));
        out.line(format!("    {}_t* s, const unsigned char* p,", prefix));
        out.line("    const unsigned char* endp,");
        out.line("    const unsigned char* seq, uint32_t seq_len) {");
        out.indent += 1;
        out.line("uint32_t index;");
        out.line("llparse_match_t res;");
        out.blank();
        out.line("index = s->_index;");
        out.open("for (; p != endp; p++) {");
        out.line("unsigned char current;");
        out.blank();
        out.line(format!("current = {};", read));
        out.open("if (current == seq[index]) {");
        out.open("if (++index == seq_len) {");
        out.line("res.status = kMatchComplete;");
        out.line("goto reset;");
        out.close("}");
        out.close("} else {");
        out.indent += 1;
        out.line("res.status = kMatchMismatch;");
        out.line("goto reset;");
        out.close("}");
        out.close("}");
        out.line("s->_index = index;");
        out.line("res.status = kMatchPause;");
        out.line("res.current = p;");
        out.line("return res;");
        out.indent -= 1;
        out.line("reset:");
        out.indent += 1;
        out.line("s->_index = 0;");
        out.line("res.current = p;");
        out.line("return res;");
        out.close("}");
        out.blank();
    }
}

fn emit_code(out: &mut Out, grammar: &Grammar, code: &Code, name: &str) {
    let prefix = grammar.prefix();
    out.line(format!("int {}(", name));
    out.line(format!("    {}_t* state,", prefix));
    out.line("    const unsigned char* p,");
    if code.uses_match() {
        out.line("    const unsigned char* endp,");
        out.line("    int match) {");
    } else {
        out.line("    const unsigned char* endp) {");
    }
    out.indent += 1;
    match code {
        Code::Match(_) => {}
        Code::Store(f) => {
            out.line(format!("state->{} = match;", f));
            out.line("return 0;");
        }
        Code::Load(f) => out.line(format!("return state->{};", f)),
        Code::Update(f, v) => {
            out.line(format!("state->{} = {};", f, v));
            out.line("return 0;");
        }
        Code::IsEqual(f, v) => out.line(format!("return state->{} == {};", f, v)),
        Code::Or(f, v) => {
            out.line(format!("state->{} |= {};", f, v));
            out.line("return 0;");
        }
        Code::And(f, v) => {
            out.line(format!("state->{} &= {};", f, v));
            out.line("return 0;");
        }
        Code::Test(f, v) => out.line(format!("return (state->{} & {}) == {};", f, v, v)),
        Code::MulAdd { field, base, max } => {
            let width = grammar
                .property(field)
                .and_then(|p| p.ty.max_value())
                .unwrap_or(u64::MAX);
            out.line("/* Multiplication overflow */");
            out.open(format!(
                "if (state->{} > {} / {}) {{",
                field,
                max_literal(width),
                base
            ));
            out.line("return 1;");
            out.close("}");
            out.line(format!("state->{} *= {};", field, base));
            out.blank();
            out.line("/* Addition overflow */");
            out.open("if (match >= 0) {");
            out.open(format!(
                "if (state->{} > {} - match) {{",
                field,
                max_literal(width)
            ));
            out.line("return 1;");
            out.close("}");
            out.close("}");
            out.line(format!("state->{} += match;", field));
            if let Some(max) = max {
                out.blank();
                out.line("/* Enforce maximum */");
                out.open(format!("if (state->{} > {}) {{", field, max));
                out.line("return 1;");
                out.close("}");
            }
            out.line("return 0;");
        }
    }
    out.close("}");
    out.blank();
}

fn emit_jump(out: &mut Out, names: &Names, jump: &Jump) {
    if jump.consume {
        out.line("p++;");
    }
    if let Some(value) = jump.value {
        out.line(format!("match = {};", value));
    }
    out.line(format!("goto {};", names.state(jump.target)));
}

fn emit_suspend_check(out: &mut Out, names: &Names, id: StateId) {
    out.open("if (p == endp) {");
    out.line(format!("return {};", names.state(id)));
    out.close("}");
}

fn emit_debug(out: &mut Out, options: &CompileOptions, message: String) {
    if let Some(debug) = &options.debug {
        out.line(format!(
            "{}(state, (const char*) p, (const char*) endp,",
            debug
        ));
        out.line(format!("    {});", c_string(&message)));
    }
}

fn read_expr(transform: &Option<Transform>) -> &'static str {
    match transform {
        Some(Transform::ToLowerUnsafe) => "((*p) | 0x20)",
        None => "*p",
    }
}

fn emit_state(
    out: &mut Out,
    grammar: &Grammar,
    names: &Names,
    options: &CompileOptions,
    id: StateId,
    name: &str,
    kind: &StateKind,
) {
    if kind.reads_input() {
        let label = match kind {
            StateKind::Sequence { .. } => "Sequence",
            StateKind::Consume { .. } => "Consume",
            _ => "Match",
        };
        emit_debug(out, options, format!("{} `{}`", label, name));
    }

    match kind {
        StateKind::Single {
            transform,
            edges,
            otherwise,
        } => {
            if edges.is_empty() {
                if otherwise.consume {
                    emit_suspend_check(out, names, id);
                }
                emit_jump(out, names, otherwise);
                return;
            }

            let tabled = transform.is_none()
                && edges.len() >= TABLE_THRESHOLD
                && edges.iter().all(|(_, j)| j.value.is_none());
            if tabled {
                emit_table(out, names, id, edges, otherwise);
                return;
            }

            emit_suspend_check(out, names, id);
            out.open(format!("switch ({}) {{", read_expr(transform)));
            for (byte, jump) in edges {
                out.open(format!("case {}: {{", c_char(*byte)));
                emit_jump(out, names, jump);
                out.close("}");
            }
            out.open("default: {");
            emit_jump(out, names, otherwise);
            out.close("}");
            out.close("}");
            out.line("/* UNREACHABLE */;");
            out.line("abort();");
        }
        StateKind::Sequence {
            transform,
            bytes,
            on_match,
            otherwise,
        } => {
            let helper = if transform.is_some() { "to_lower_unsafe" } else { "id" };
            out.line("llparse_match_t match_seq;");
            out.blank();
            emit_suspend_check(out, names, id);
            out.line(format!(
                "match_seq = llparse__match_sequence_{}(state, p, endp, llparse_blob{}, {});",
                helper,
                names.blob(bytes),
                bytes.len()
            ));
            out.line("p = match_seq.current;");
            out.open("switch (match_seq.status) {");
            out.open("case kMatchComplete: {");
            emit_jump(out, names, on_match);
            out.close("}");
            out.open("case kMatchPause: {");
            out.line(format!("return {};", names.state(id)));
            out.close("}");
            out.open("case kMatchMismatch: {");
            emit_jump(out, names, otherwise);
            out.close("}");
            out.close("}");
            out.line("/* UNREACHABLE */;");
            out.line("abort();");
        }
        StateKind::Invoke { code, map, otherwise } => {
            let call = if code.uses_match() {
                format!("{}(state, p, endp, match)", names.codes[code])
            } else {
                format!("{}(state, p, endp)", names.codes[code])
            };
            out.open(format!("switch ({}) {{", call));
            for (value, target) in map {
                out.line(format!("case {}:", value));
                out.line(format!("  goto {};", names.state(*target)));
            }
            out.line("default:");
            out.line(format!("  goto {};", names.state(*otherwise)));
            out.close("}");
            out.line("/* UNREACHABLE */;");
            out.line("abort();");
        }
        StateKind::SpanStart { span, next } => {
            out.line(format!("state->_span_pos{} = (void*) p;", span));
            out.line(format!("goto {};", names.state(*next)));
        }
        StateKind::SpanEnd { span, next } => {
            let callback = &grammar.spans()[*span].callback;
            out.line("const unsigned char* start;");
            out.line("int err;");
            out.blank();
            out.line(format!("start = state->_span_pos{};", span));
            out.line(format!("state->_span_pos{} = NULL;", span));
            out.line(format!("err = {}(state, start, p);", callback));
            out.open("if (err != 0) {");
            out.line("state->error = err;");
            out.line("state->error_pos = (const char*) p;");
            out.line(format!(
                "state->_current = (void*) (intptr_t) {};",
                names.state(*next)
            ));
            out.line("return s_error;");
            out.close("}");
            out.line(format!("goto {};", names.state(*next)));
        }
        StateKind::Consume { field, next } => {
            let ty = grammar
                .property(field)
                .map(|p| p.ty)
                .unwrap_or(PropertyType::I64);
            out.line("size_t avail;");
            out.line(format!("{} need;", ty.c_type()));
            out.blank();
            out.line("avail = endp - p;");
            out.line(format!("need = state->{};", field));
            out.open("if (avail >= need) {");
            out.line("p += need;");
            out.line(format!("state->{} = 0;", field));
            out.line(format!("goto {};", names.state(*next)));
            out.close("}");
            out.blank();
            out.line(format!("state->{} -= avail;", field));
            out.line(format!("return {};", names.state(id)));
        }
        StateKind::Error { code, reason } => {
            out.line(format!("state->error = 0x{:x};", code));
            out.line(format!("state->reason = {};", c_string(reason)));
            out.line("state->error_pos = (const char*) p;");
            out.line("state->_current = (void*) (intptr_t) s_error;");
            out.line("return s_error;");
        }
        StateKind::Pause { code, reason, next } => {
            out.line(format!("state->error = 0x{:x};", code));
            out.line(format!("state->reason = {};", c_string(reason)));
            out.line("state->error_pos = (const char*) p;");
            out.line(format!(
                "state->_current = (void*) (intptr_t) {};",
                names.state(*next)
            ));
            out.line("return s_error;");
        }
    }
}

fn emit_table(
    out: &mut Out,
    names: &Names,
    id: StateId,
    edges: &[(u8, Jump)],
    otherwise: &Jump,
) {
    // Slot 0 is the otherwise branch.
    let mut targets: Vec<Jump> = Vec::new();
    let mut table = [0usize; 256];
    for (byte, jump) in edges {
        let slot = match targets.iter().position(|t| t == jump) {
            Some(i) => i + 1,
            None => {
                targets.push(*jump);
                targets.len()
            }
        };
        table[*byte as usize] = slot;
    }

    out.open("static uint8_t lookup_table[] = {");
    for row in table.chunks(16) {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        out.line(format!("{},", cells.join(", ")));
    }
    out.close("};");
    emit_suspend_check(out, names, id);
    out.open("switch (lookup_table[(uint8_t) *p]) {");
    for (i, jump) in targets.iter().enumerate() {
        out.open(format!("case {}: {{", i + 1));
        emit_jump(out, names, jump);
        out.close("}");
    }
    out.open("default: {");
    emit_jump(out, names, otherwise);
    out.close("}");
    out.close("}");
    out.line("/* UNREACHABLE */;");
    out.line("abort();");
}

fn emit_execute(out: &mut Out, grammar: &Grammar) {
    let prefix = grammar.prefix();
    out.open(format!(
        "int {p}_execute({p}_t* state, const char* p, const char* endp) {{",
        p = prefix
    ));
    out.line("llparse_state_t next;");
    out.blank();
    out.line("/* check lingering errors */");
    out.open("if (state->error != 0) {");
    out.line("return state->error;");
    out.close("}");
    out.blank();
    if !grammar.spans().is_empty() {
        out.line("/* restart spans */");
        for i in 0..grammar.spans().len() {
            out.open(format!("if (state->_span_pos{} != NULL) {{", i));
            out.line(format!("state->_span_pos{} = (void*) p;", i));
            out.close("}");
        }
        out.blank();
    }
    out.line(format!(
        "next = {}__run(state, (const unsigned char*) p, (const unsigned char*) endp);",
        prefix
    ));
    out.open("if (next == s_error) {");
    out.line("return state->error;");
    out.close("}");
    out.line("state->_current = (void*) (intptr_t) next;");
    out.blank();
    if !grammar.spans().is_empty() {
        out.line("/* execute spans */");
        for (i, span) in grammar.spans().iter().enumerate() {
            out.open(format!("if (state->_span_pos{} != NULL) {{", i));
            out.line("int error;");
            out.blank();
            out.line(format!(
                "error = {}(state, state->_span_pos{}, (const unsigned char*) endp);",
                span.callback, i
            ));
            out.open("if (error != 0) {");
            out.line("state->error = error;");
            out.line("state->error_pos = endp;");
            out.line("return error;");
            out.close("}");
            out.close("}");
        }
        out.blank();
    }
    out.line("return 0;");
    out.close("}");
}
