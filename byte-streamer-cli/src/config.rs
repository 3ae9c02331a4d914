/********************************************************************************
 * Copyright (c) 2025 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Line-oriented pipeline configuration parser.
//!
//! Grammar (blank lines and `#` comments ignored):
//!
//! ```text
//! param    NAME DESCRIPTION
//! endpoint NAME = KIND(CONFIG) [depends OTHER]
//! connect  FROM -> [FILTER1(CFG1) ->] ... -> TO
//! ```
//!
//! `[$NAME$]` occurrences in endpoint and connect lines are substituted
//! with the positional CLI argument bound to the param of that name, in
//! declaration order, before the line is parsed. Errors carry the 1-based
//! line number.

use byte_streamer::{ConnectInfo, EndpointInfo, FilterInfo, Pipeline};
use regex::Regex;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("line {line}: unrecognised directive: [{text}]")]
    UnknownDirective { line: usize, text: String },

    #[error("line {line}: invalid param definition: {text}")]
    InvalidParam { line: usize, text: String },

    #[error("line {line}: invalid endpoint definition: {text}")]
    InvalidEndpoint { line: usize, text: String },

    #[error("line {line}: invalid connection: {text}")]
    InvalidConnection { line: usize, text: String },

    #[error("line {line}: invalid filter: {text}")]
    InvalidFilter { line: usize, text: String },

    #[error("line {line}: no value provided for param: {name}")]
    MissingParamValue { line: usize, name: String },
}

/// Parses a configuration file's contents against the positional param
/// values from the command line.
pub fn parse_config(contents: &str, args: &[String]) -> Result<Pipeline, ConfigError> {
    Parser::new(args).parse(contents)
}

struct ParamInfo {
    name: String,
}

struct Parser<'a> {
    args: &'a [String],
    params: Vec<ParamInfo>,
    endpoint_re: Regex,
    filter_re: Regex,
    param_re: Regex,
}

impl<'a> Parser<'a> {
    fn new(args: &'a [String]) -> Self {
        Self {
            args,
            params: Vec::new(),
            endpoint_re: Regex::new(r"^\s*(\w+)\s*=\s*(\w+)\s*\((.*)\)\s*(?:depends\s+(\w+)\s*)?$")
                .expect("endpoint pattern is valid"),
            filter_re: Regex::new(r"^\s*(\w+)\((.*)\)\s*$").expect("filter pattern is valid"),
            param_re: Regex::new(r"^\s*(\w+)\s+(\S.*)$").expect("param pattern is valid"),
        }
    }

    fn parse(mut self, contents: &str) -> Result<Pipeline, ConfigError> {
        let mut pipeline = Pipeline::default();

        for (index, raw_line) in contents.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            match keyword {
                "param" => self.parse_param(rest, line_number)?,
                "endpoint" => {
                    let endpoint = self.parse_endpoint(rest, line_number)?;
                    pipeline.endpoints.push(endpoint);
                }
                "connect" => {
                    let connect = self.parse_connect(rest, line_number)?;
                    pipeline.connections.push(connect);
                }
                _ => {
                    return Err(ConfigError::UnknownDirective {
                        line: line_number,
                        text: line.to_string(),
                    })
                }
            }
        }

        Ok(pipeline)
    }

    fn parse_param(&mut self, text: &str, line_number: usize) -> Result<(), ConfigError> {
        let Some(parts) = self.param_re.captures(text) else {
            return Err(ConfigError::InvalidParam {
                line: line_number,
                text: text.to_string(),
            });
        };

        let name = parts[1].to_string();
        debug!(param = name.as_str(), description = &parts[2], "declared parameter");
        self.params.push(ParamInfo { name });
        Ok(())
    }

    fn parse_endpoint(&self, text: &str, line_number: usize) -> Result<EndpointInfo, ConfigError> {
        let text = self.replace_params(text, line_number)?;
        let Some(parts) = self.endpoint_re.captures(&text) else {
            return Err(ConfigError::InvalidEndpoint {
                line: line_number,
                text: text.to_string(),
            });
        };

        Ok(EndpointInfo {
            name: parts[1].to_string(),
            kind: parts[2].to_string(),
            config: parts[3].to_string(),
            depends: parts.get(4).map(|depends| depends.as_str().to_string()),
        })
    }

    fn parse_connect(&self, text: &str, line_number: usize) -> Result<ConnectInfo, ConfigError> {
        let text = self.replace_params(text, line_number)?;
        let parts: Vec<&str> = text.split("->").collect();
        if parts.len() < 2 {
            return Err(ConfigError::InvalidConnection {
                line: line_number,
                text: text.to_string(),
            });
        }

        let mut filters = Vec::new();
        for part in &parts[1..parts.len() - 1] {
            let Some(filter) = self.filter_re.captures(part) else {
                return Err(ConfigError::InvalidFilter {
                    line: line_number,
                    text: part.trim().to_string(),
                });
            };
            filters.push(FilterInfo {
                name: filter[1].to_string(),
                config: filter[2].to_string(),
            });
        }

        Ok(ConnectInfo {
            from: parts[0].trim().to_string(),
            to: parts[parts.len() - 1].trim().to_string(),
            filters,
        })
    }

    /// Substitutes `[$NAME$]` occurrences with the positional argument
    /// bound to each declared param, in declaration order.
    fn replace_params(&self, text: &str, line_number: usize) -> Result<String, ConfigError> {
        let mut line = text.to_string();
        for (index, param) in self.params.iter().enumerate() {
            let Some(value) = self.args.get(index) else {
                return Err(ConfigError::MissingParamValue {
                    line: line_number,
                    name: param.name.clone(),
                });
            };
            line = line.replace(&format!("[${}$]", param.name), value);
        }
        Ok(line)
    }
}
