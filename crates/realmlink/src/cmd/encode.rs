use realmlink_codec::{Codec, Value};

use crate::cmd::{read_input, EncodeArgs};
use crate::exit::{codec_error, json_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let text = read_input(args.input.as_deref())?;
    let code = encode_text(&text)?;
    print_json(&code, format);
    Ok(SUCCESS)
}

fn encode_text(text: &str) -> CliResult<serde_json::Value> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|err| json_error("input is not valid JSON", err))?;
    let value = Value::from(json);
    tracing::debug!(kind = value.kind(), "encoding input");
    Codec::default()
        .encode_without_references(&value)
        .map_err(|err| codec_error("encode failed", err))
}
