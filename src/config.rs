//! Project configuration
//!
//! A SqueezeMeta project records its file layout and run options in
//! `SqueezeMeta_conf.pl`, a list of Perl scalar assignments:
//!
//! ```text
//! $projectname = "test";
//! $resultpath  = "$basedir/$projectname/results";
//! $mergedfile  = "$resultpath/13.$projectname.orftable";
//! $nokegg      = 0;
//! ```
//!
//! [`PerlConf`] reads those assignments (interpolating `$var` references in
//! double-quoted values) and [`TablesConfig`] picks out what the table
//! builder needs.

use crate::orf_table::Annotation;
use crate::utils::{open_table, validate_file_readable};
use crate::{SqmError, SqmResult};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Name of the configuration file inside a project directory
pub const CONF_FILE_NAME: &str = "SqueezeMeta_conf.pl";

/// Scalar variables of a SqueezeMeta configuration file, keyed with their `$`
#[derive(Debug, Clone, Default)]
pub struct PerlConf {
    vars: HashMap<String, String>,
}

impl PerlConf {
    /// Read `<project>/SqueezeMeta_conf.pl`
    pub fn from_project<P: AsRef<Path>>(project_path: P) -> SqmResult<Self> {
        Self::read(project_path.as_ref().join(CONF_FILE_NAME))
    }

    pub fn read<P: AsRef<Path>>(path: P) -> SqmResult<Self> {
        let mut conf = PerlConf::default();
        for line in open_table(&path)?.lines() {
            conf.parse_line(&line?);
        }
        log::debug!("Read {} variables from {:?}", conf.vars.len(), path.as_ref());
        Ok(conf)
    }

    pub fn parse(text: &str) -> Self {
        let mut conf = PerlConf::default();
        for line in text.lines() {
            conf.parse_line(line);
        }
        conf
    }

    fn parse_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return;
        }
        let Some((name, rhs)) = line.split_once('=') else {
            log::trace!("Ignoring configuration line: {}", line);
            return;
        };
        let name = name.trim();
        if !name.starts_with('$') || name.len() < 2 || !is_identifier(&name[1..]) {
            log::trace!("Ignoring configuration line: {}", line);
            return;
        }

        let rhs = rhs.trim_start();
        let value = if let Some(rest) = rhs.strip_prefix('"') {
            let raw = rest.split('"').next().unwrap_or("");
            self.interpolate(raw)
        } else if let Some(rest) = rhs.strip_prefix('\'') {
            rest.split('\'').next().unwrap_or("").to_string()
        } else {
            rhs.split(|c: char| c == ';' || c == '#' || c.is_whitespace())
                .next()
                .unwrap_or("")
                .to_string()
        };
        self.vars.insert(name.to_string(), value);
    }

    /// Replace `$name` and `${name}` with previously defined values
    fn interpolate(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
                match braced.find('}') {
                    Some(end) => (&braced[..end], end + 2),
                    None => ("", 0),
                }
            } else {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            };

            match self.vars.get(&format!("${}", name)) {
                Some(value) if !name.is_empty() => {
                    out.push_str(value);
                    rest = &after[consumed..];
                }
                _ => {
                    out.push('$');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> SqmResult<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| SqmError::InvalidConfig(format!("{} is not set", key)))
    }

    /// Integer flag coerced to a boolean: 0 is false, any other integer true
    pub fn flag(&self, key: &str) -> SqmResult<bool> {
        let raw = self.get(key)?;
        raw.trim()
            .parse::<i64>()
            .map(|v| v != 0)
            .map_err(|_| SqmError::InvalidConfig(format!("{} must be an integer, got '{}'", key, raw)))
    }
}

fn is_identifier(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Inputs and switches for building the tables
#[derive(Debug, Clone, PartialEq)]
pub struct TablesConfig {
    pub project_name: String,
    pub orf_table: PathBuf,
    /// Per-ORF taxonomy tables are `<prefix>.wranks` and `<prefix>.noidfilter.wranks`
    pub orf_taxonomy_prefix: String,
    pub contig_table: PathBuf,
    pub kegg: bool,
    pub cog: bool,
    pub pfam: bool,
    pub double_pass: bool,
}

impl TablesConfig {
    pub fn from_conf(conf: &PerlConf) -> SqmResult<Self> {
        let double_pass = conf.flag("$doublepass")?;
        let prefix_key = if double_pass { "$fun3tax_blastx" } else { "$fun3tax" };

        Ok(TablesConfig {
            project_name: conf.get("$projectname")?.to_string(),
            orf_table: PathBuf::from(conf.get("$mergedfile")?),
            orf_taxonomy_prefix: conf.get(prefix_key)?.to_string(),
            contig_table: PathBuf::from(conf.get("$contigtable")?),
            kegg: !conf.flag("$nokegg")?,
            cog: !conf.flag("$nocog")?,
            pfam: !conf.flag("$nopfam")?,
            double_pass,
        })
    }

    pub fn from_project<P: AsRef<Path>>(project_path: P) -> SqmResult<Self> {
        Self::from_conf(&PerlConf::from_project(project_path)?)
    }

    /// Annotation systems that were run
    pub fn annotations(&self) -> Vec<Annotation> {
        Annotation::ALL
            .into_iter()
            .filter(|a| match a {
                Annotation::Kegg => self.kegg,
                Annotation::Cog => self.cog,
                Annotation::Pfam => self.pfam,
            })
            .collect()
    }

    /// Identity-filtered per-ORF taxonomy
    pub fn filtered_taxonomy(&self) -> PathBuf {
        PathBuf::from(format!("{}.wranks", self.orf_taxonomy_prefix))
    }

    /// Unfiltered per-ORF taxonomy
    pub fn unfiltered_taxonomy(&self) -> PathBuf {
        PathBuf::from(format!("{}.noidfilter.wranks", self.orf_taxonomy_prefix))
    }

    /// Check that the project name is usable and every input is readable
    pub fn validate(&self) -> SqmResult<()> {
        if self.project_name.trim().is_empty() {
            return Err(SqmError::InvalidConfig(
                "project name must not be empty".to_string(),
            ));
        }
        if self.project_name.contains('/') {
            return Err(SqmError::InvalidConfig(format!(
                "project name '{}' must not contain '/'",
                self.project_name
            )));
        }

        validate_file_readable(&self.orf_table)?;
        validate_file_readable(self.filtered_taxonomy())?;
        validate_file_readable(self.unfiltered_taxonomy())?;
        validate_file_readable(&self.contig_table)?;
        Ok(())
    }
}
