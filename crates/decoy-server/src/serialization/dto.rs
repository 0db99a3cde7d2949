//! Wire types for the JSON representation of expectations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A token: either a plain string or `{"not": true, "value": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenDto {
    Plain(String),
    Negatable {
        #[serde(default)]
        not: bool,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyToMultiValueDto {
    pub name: TokenDto,
    #[serde(default)]
    pub values: Vec<TokenDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyToValueDto {
    pub name: TokenDto,
    pub value: TokenDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(TokenDto),
    Many(Vec<TokenDto>),
}

/// Headers or query parameters: a list of `{name, values}` or an object map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultiValueCollection {
    List(Vec<KeyToMultiValueDto>),
    Map(BTreeMap<String, OneOrMany>),
}

/// Cookies: a list of `{name, value}` or an object map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SingleValueCollection {
    List(Vec<KeyToValueDto>),
    Map(BTreeMap<String, TokenDto>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchTypeDto {
    #[default]
    OnlyMatchingFields,
    Strict,
}

/// Typed request body pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypedBodyDto {
    String {
        #[serde(alias = "string")]
        value: String,
        #[serde(default, skip_serializing_if = "is_false")]
        not: bool,
    },
    Regex {
        #[serde(alias = "regex")]
        value: String,
        #[serde(default, skip_serializing_if = "is_false")]
        not: bool,
    },
    #[serde(rename_all = "camelCase")]
    Json {
        /// A JSON value, or a string holding serialized JSON
        json: Value,
        #[serde(default)]
        match_type: MatchTypeDto,
        #[serde(default, skip_serializing_if = "is_false")]
        not: bool,
    },
    Parameters {
        parameters: MultiValueCollection,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BodyDto {
    Plain(String),
    Typed(TypedBodyDto),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<TokenDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<TokenDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string_parameters: Option<MultiValueCollection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<MultiValueCollection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<SingleValueCollection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypedResponseBodyDto {
    String {
        #[serde(alias = "string")]
        value: String,
    },
    #[serde(rename_all = "camelCase")]
    Binary { base64_bytes: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBodyDto {
    Plain(String),
    Typed(TypedResponseBodyDto),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnitDto {
    #[default]
    Milliseconds,
    Seconds,
    Minutes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayDto {
    #[serde(default)]
    pub time_unit: TimeUnitDto,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponseDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<MultiValueCollection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<SingleValueCollection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ResponseBodyDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelayDto>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemeDto {
    #[default]
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpForwardDto {
    pub host: String,
    #[serde(default = "default_forward_port")]
    pub port: u16,
    #[serde(default)]
    pub scheme: SchemeDto,
}

fn default_forward_port() -> u16 {
    80
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpCallbackDto {
    #[serde(alias = "callbackClass")]
    pub callback_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesDto {
    #[serde(default)]
    pub remaining_times: u64,
    #[serde(default)]
    pub unlimited: bool,
}

/// A complete expectation as exchanged over the admin API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectationDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_request: Option<HttpRequestDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_response: Option<HttpResponseDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_forward: Option<HttpForwardDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_callback: Option<HttpCallbackDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<TimesDto>,
}

/// A logged request with its arrival time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedRequestDto {
    #[serde(flatten)]
    pub request: HttpRequestDto,
    pub timestamp: String,
}

/// Either one expectation or a list, as accepted by registration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrManyExpectations {
    Many(Vec<ExpectationDto>),
    One(Box<ExpectationDto>),
}

impl OneOrManyExpectations {
    pub fn into_vec(self) -> Vec<ExpectationDto> {
        match self {
            OneOrManyExpectations::One(dto) => vec![*dto],
            OneOrManyExpectations::Many(dtos) => dtos,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
