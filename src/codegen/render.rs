//! IR to source rendering
//!
//! Renders a `GeneratedModule` into standalone source text for
//! external compilation or inspection. The in-process backend never
//! goes through this; it interprets the IR directly. Output shape: one
//! serialize and one deserialize entry function plus one function per
//! cycle-breaking auxiliary.

use crate::constraints::TypeGuard;
use crate::schema::LogicalSchema;
use crate::value::Datum;

use super::ir::{AuxFn, GeneratedModule, Location, Mode, Stmt};

/// Render the whole module to source text.
pub fn render(module: &GeneratedModule) -> String {
    let mut r = Renderer::new();
    r.line(&format!("// Generated codec for {}", module.identifier));
    r.blank();
    r.function("serialize", Mode::Serialize, &module.serialize);
    r.blank();
    r.function("deserialize", Mode::Deserialize, &module.deserialize);
    for aux in &module.aux {
        r.blank();
        r.aux_function(aux);
    }
    r.finish()
}

struct Renderer {
    out: String,
    indent: usize,
}

impl Renderer {
    fn new() -> Renderer {
        Renderer {
            out: String::new(),
            indent: 0,
        }
    }

    fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn function(&mut self, name: &str, mode: Mode, body: &[Stmt]) {
        match mode {
            Mode::Serialize => self.line(&format!(
                "pub fn {name}(data: &mut Datum, buffer: &mut OutputBuffer) -> Result<(), CodecError> {{"
            )),
            Mode::Deserialize => self.line(&format!(
                "pub fn {name}(input: &mut &[u8]) -> Result<Datum, CodecError> {{"
            )),
        }
        self.indent += 1;
        if mode == Mode::Deserialize {
            self.line("let mut data = Datum::Null;");
        }
        for stmt in body {
            self.stmt(stmt);
        }
        match mode {
            Mode::Serialize => self.line("Ok(())"),
            Mode::Deserialize => self.line("Ok(data)"),
        }
        self.indent -= 1;
        self.line("}");
    }

    fn aux_function(&mut self, aux: &AuxFn) {
        self.function(&aux.name, aux.mode, &aux.body);
    }

    fn block(&mut self, body: &[Stmt]) {
        self.indent += 1;
        for stmt in body {
            self.stmt(stmt);
        }
        self.indent -= 1;
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::WriteNull => self.line("write_null(buffer.buf());"),
            Stmt::WritePrimitive { primitive, value } => self.line(&format!(
                "write_{}(buffer.buf(), {});",
                primitive.name(),
                value.render()
            )),
            Stmt::WriteLongLit(literal) => {
                self.line(&format!("write_long(buffer.buf(), {literal});"))
            }
            Stmt::WriteFixed { size, value } => self.line(&format!(
                "write_fixed(buffer.buf(), {size}, &{}, \"{}\")?;",
                value.render(),
                value.render()
            )),
            Stmt::WriteEnum { symbols, value } => self.line(&format!(
                "write_enum(buffer.buf(), &{}, &{})?;",
                render_symbols(symbols),
                value.render()
            )),
            Stmt::WriteLogical { spec, value } => self.line(&format!(
                "write_{}(buffer.buf(), &{})?;",
                logical_suffix(spec),
                value.render()
            )),
            Stmt::SerializeArray { over, item, body } => {
                let over = over.render();
                self.line(&format!("if !{over}.is_empty() {{"));
                self.indent += 1;
                self.line(&format!("write_long(buffer.buf(), {over}.len() as i64);"));
                self.line(&format!("for {item} in &{over} {{"));
                self.block(body);
                self.line("}");
                self.indent -= 1;
                self.line("}");
                self.line("write_long(buffer.buf(), 0);");
            }
            Stmt::SerializeMap { over, key, body } => {
                let over = over.render();
                self.line(&format!("if !{over}.is_empty() {{"));
                self.indent += 1;
                self.line(&format!("write_long(buffer.buf(), {over}.len() as i64);"));
                self.line(&format!("for {key} in {over}.keys() {{"));
                self.indent += 1;
                self.line(&format!("write_string(buffer.buf(), {key});"));
                for stmt in body {
                    self.stmt(stmt);
                }
                self.indent -= 1;
                self.line("}");
                self.indent -= 1;
                self.line("}");
                self.line("write_long(buffer.buf(), 0);");
            }
            Stmt::Flush => self.line("buffer.flush();"),
            Stmt::CallSerialize { function, arg } => {
                self.line(&format!("{function}(&mut {}, buffer)?;", arg.render()))
            }
            Stmt::DefaultIfMissing { target, default } => {
                let target = target.render();
                self.line(&format!("if is_missing(&{target}) {{"));
                self.indent += 1;
                self.line(&format!("{target} = {};", render_datum(default)));
                self.indent -= 1;
                self.line("}");
            }
            Stmt::Branch { arms, otherwise } => {
                for (index, (cond, body)) in arms.iter().enumerate() {
                    let keyword = if index == 0 { "if" } else { "} else if" };
                    self.line(&format!(
                        "{keyword} {} {{",
                        render_guard(&cond.guard, &cond.at)
                    ));
                    self.block(body);
                }
                self.line("} else {");
                self.block(otherwise);
                self.line("}");
            }
            Stmt::Fail { location } => self.line(&format!(
                "return Err(CodecError::NoUnionBranch {{ location: \"{location}\".into() }});"
            )),

            Stmt::ReadPrimitive { primitive, target } => self.line(&format!(
                "{} = read_{}(input)?;",
                target.render(),
                primitive.name()
            )),
            Stmt::ReadFixed { size, target } => self.line(&format!(
                "{} = read_fixed(input, {size})?;",
                target.render()
            )),
            Stmt::ReadEnum { symbols, target } => self.line(&format!(
                "{} = read_enum(input, &{})?;",
                target.render(),
                render_symbols(symbols)
            )),
            Stmt::ReadLogical { spec, target } => self.line(&format!(
                "{} = read_{}(input)?;",
                target.render(),
                logical_suffix(spec)
            )),
            Stmt::NewRecord { target } => {
                self.line(&format!("{} = record();", target.render()))
            }
            Stmt::DeserializeArray { target, item, body } => {
                let target = target.render();
                self.line(&format!("{target} = array();"));
                self.line("let mut count = read_long(input)?;");
                self.line("while count != 0 {");
                self.indent += 1;
                self.line("if count < 0 {");
                self.indent += 1;
                self.line("count = -count;");
                self.line("read_long(input)?;");
                self.indent -= 1;
                self.line("}");
                self.line("for _ in 0..count {");
                self.indent += 1;
                self.line(&format!("let mut {item} = Datum::Null;"));
                for stmt in body {
                    self.stmt(stmt);
                }
                self.line(&format!("{target}.push({item});"));
                self.indent -= 1;
                self.line("}");
                self.line("count = read_long(input)?;");
                self.indent -= 1;
                self.line("}");
            }
            Stmt::DeserializeMap { target, key, body } => {
                let target = target.render();
                self.line(&format!("{target} = map();"));
                self.line("let mut count = read_long(input)?;");
                self.line("while count != 0 {");
                self.indent += 1;
                self.line("if count < 0 {");
                self.indent += 1;
                self.line("count = -count;");
                self.line("read_long(input)?;");
                self.indent -= 1;
                self.line("}");
                self.line("for _ in 0..count {");
                self.indent += 1;
                self.line(&format!("let {key} = read_string(input)?;"));
                for stmt in body {
                    self.stmt(stmt);
                }
                self.indent -= 1;
                self.line("}");
                self.line("count = read_long(input)?;");
                self.indent -= 1;
                self.line("}");
            }
            Stmt::CallDeserialize { function, target } => self.line(&format!(
                "{} = {function}(input)?;",
                target.render()
            )),
            Stmt::ReadUnion { arms, location } => {
                self.line("match read_long(input)? {");
                self.indent += 1;
                for (index, body) in arms.iter().enumerate() {
                    self.line(&format!("{index} => {{"));
                    self.block(body);
                    self.line("}");
                }
                self.line(&format!(
                    "index => return Err(CodecError::InvalidUnionIndex {{ index, arms: {} }}), // at {location}",
                    arms.len()
                ));
                self.indent -= 1;
                self.line("}");
            }
        }
    }
}

fn render_guard(guard: &TypeGuard, at: &Location) -> String {
    let at = at.render();
    match guard {
        TypeGuard::Null => format!("is_null(&{at})"),
        TypeGuard::Boolean => format!("is_boolean(&{at})"),
        TypeGuard::Int => format!("is_int(&{at})"),
        TypeGuard::Long => format!("is_long(&{at})"),
        TypeGuard::Float => format!("is_float(&{at})"),
        TypeGuard::Double => format!("is_double(&{at})"),
        TypeGuard::Bytes | TypeGuard::FixedBytes => format!("is_bytes(&{at})"),
        TypeGuard::String => format!("is_string(&{at})"),
        TypeGuard::Array => format!("is_array(&{at})"),
        TypeGuard::Map => format!("is_map(&{at})"),
        TypeGuard::RecordShape => format!("is_record(&{at})"),
        TypeGuard::EnumSymbol(symbols) => {
            format!("is_symbol(&{at}, &{})", render_symbols(symbols))
        }
        TypeGuard::Logical(kind) => {
            format!("is_{}(&{at})", kind.name().replace('-', "_"))
        }
    }
}

fn render_symbols(symbols: &[String]) -> String {
    let quoted: Vec<String> = symbols.iter().map(|s| format!("{s:?}")).collect();
    format!("[{}]", quoted.join(", "))
}

fn logical_suffix(spec: &LogicalSchema) -> String {
    spec.kind.name().replace('-', "_")
}

fn render_datum(datum: &Datum) -> String {
    match datum {
        Datum::Null => "Datum::Null".to_string(),
        Datum::Boolean(v) => format!("Datum::Boolean({v})"),
        Datum::Int(v) => format!("Datum::Int({v})"),
        Datum::Long(v) => format!("Datum::Long({v})"),
        Datum::Float(v) => format!("Datum::Float({v:?})"),
        Datum::Double(v) => format!("Datum::Double({v:?})"),
        Datum::String(v) => format!("Datum::String({v:?}.into())"),
        Datum::Bytes(v) => format!("Datum::Bytes(vec!{v:?})"),
        other => format!("/* default */ {other:?}"),
    }
}
