use realmlink_codec::{inspect, Codec, ErrorValue, Function, FunctionBinder, Value};

use crate::cmd::{read_input, DecodeArgs};
use crate::exit::{codec_error, json_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

/// Binder for values decoded outside any connection.
///
/// Functions decode to stand-ins that keep their arity and reject every call.
struct DetachedBinder;

impl FunctionBinder for DetachedBinder {
    fn export_function(&self, function: &Function) -> String {
        format!("{:x}", function.identity())
    }

    fn import_function(&self, key: &str, arity: usize) -> Function {
        let message = format!("function {key} is not connected to a realm");
        Function::from_fn(arity, move |_| {
            Err(Value::error(ErrorValue::new(message.clone())))
        })
    }
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let text = read_input(args.input.as_deref())?;
    let value = decode_text(&text)?;
    if args.inspect {
        println!("{}", inspect(&value));
    } else {
        print_json(&value.to_json(), format);
    }
    Ok(SUCCESS)
}

fn decode_text(text: &str) -> CliResult<Value> {
    let code: serde_json::Value =
        serde_json::from_str(text).map_err(|err| json_error("input is not valid JSON", err))?;
    Codec::default()
        .decode(&code, Some(&DetachedBinder), &|_, value| value)
        .map_err(|err| codec_error("decode failed", err))
}
