use super::{resolve, Page};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Page to edit
    pub file: PathBuf,

    /// Ids of the controls to remove
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Remove controls and their tags in one designer transaction
pub fn remove(args: RemoveArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let path = resolve(cwd, &args.file);
    let mut page = Page::open(&path, &config, cwd)?;
    page.print_issues();

    let ids = args.ids.clone();
    page.host.with_transaction("Remove controls", |host| {
        for id in &ids {
            host.destroy_component(id)?;
        }
        Ok(())
    })?;
    page.save()?;

    for id in &args.ids {
        println!("  {} removed {}", "✓".green(), id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_remove_controls() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        let page = dir.path().join("p.aspx");
        let markup = "<form id=\"f\" runat=\"server\">\n<asp:Label id=\"a\" runat=\"server\" />\n<asp:PlaceHolder id=\"b\" runat=\"server\"><p>x</p></asp:PlaceHolder>\n</form>";
        fs::write(&page, markup).unwrap();

        remove(
            RemoveArgs {
                file: PathBuf::from("p.aspx"),
                ids: vec!["a".into(), "B".into()],
            },
            &cwd,
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            "<form id=\"f\" runat=\"server\">\n\n\n</form>"
        );

        // unknown ids leave the file alone
        assert!(remove(
            RemoveArgs {
                file: PathBuf::from("p.aspx"),
                ids: vec!["f".into(), "ghost".into()],
            },
            &cwd,
        )
        .is_err());
        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            "<form id=\"f\" runat=\"server\">\n\n\n</form>"
        );
    }
}
