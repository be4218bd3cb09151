use super::AppContext;
use crate::{
    db::empenhos::Empenhos,
    libs::{
        empenho::EmpenhoFilter,
        export::{ExportFormat, Exporter},
        messages::Message,
    },
    msg_error_anyhow, msg_info, msg_success,
};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(short, long, value_enum, default_value = "excel")]
    format: ExportFormat,

    /// Only empenhos whose number, company or sector contains this text
    #[arg(long, conflicts_with = "ids")]
    filter: Option<String>,

    /// Comma-separated ids, e.g. `3,7,12`
    #[arg(long)]
    ids: Option<String>,
}

pub fn cmd(ctx: &AppContext, args: ExportArgs) -> Result<()> {
    let filter = match (&args.ids, &args.filter) {
        (Some(ids), _) => EmpenhoFilter::ByIds(parse_ids(ids)?),
        (None, Some(text)) => EmpenhoFilter::Search(text.clone()),
        (None, None) => EmpenhoFilter::All,
    };

    let empenhos = ctx.db.scope(|tx| Empenhos::new(tx).fetch(&filter))?;
    if empenhos.is_empty() {
        msg_info!(Message::NoEmpenhosToExport);
        return Ok(());
    }

    msg_info!(Message::ExportingData(empenhos.len(), format!("{:?}", args.format)));
    let path = Exporter::new(args.format, ctx.export_dir()?).export(&empenhos)?;

    msg_success!(Message::ExportCompleted(path.display().to_string()));
    Ok(())
}

/// Parses `1, 2,3` into ids; any non-numeric entry rejects the whole list.
pub fn parse_ids(input: &str) -> Result<Vec<i64>> {
    let ids = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| msg_error_anyhow!(Message::InvalidIdList(input.to_string())))?;

    if ids.is_empty() {
        return Err(msg_error_anyhow!(Message::InvalidIdList(input.to_string())));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lists_tolerate_spaces() {
        assert_eq!(parse_ids("3, 7,12").unwrap(), vec![3, 7, 12]);
        assert!(parse_ids("3,x").is_err());
        assert!(parse_ids(" , ").is_err());
    }
}
