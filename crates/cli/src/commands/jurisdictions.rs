// Jurisdiction listing

use anyhow::Result;
use serde::Serialize;

use crate::context::Context;
use crate::output::{format_table_row, print_table_header};

#[derive(Serialize)]
struct JurisdictionOutput<'a> {
    code: &'a str,
    name: &'a str,
    default: bool,
}

pub fn run(ctx: &Context) -> Result<()> {
    let jurisdictions = ctx.jurisdictions();
    let default_code = jurisdictions.default_code().to_string();

    if !ctx.output.is_text() {
        let entries: Vec<JurisdictionOutput> = jurisdictions
            .iter()
            .map(|j| JurisdictionOutput {
                code: &j.code,
                name: &j.name,
                default: j.code == default_code,
            })
            .collect();
        return ctx.output.print_value(&entries);
    }

    print_table_header(&[("CODE", 5), ("NAME", 24)]);
    for j in jurisdictions.iter() {
        let marker = if j.code == default_code { "  (default)" } else { "" };
        println!(
            "{}{}",
            format_table_row(&[(j.code.as_str(), 5), (j.name.as_str(), 24)]).trim_end(),
            marker
        );
    }
    Ok(())
}
