//! Conversions between wire types and the domain model.
//!
//! Wire → domain is fallible (`TryFrom`), domain → wire is total (`From`).

use super::dto::*;
use super::DtoError;
use crate::expectation::{
    Action, Cookie, Delay, Expectation, Header, HttpCallback, HttpForward, HttpResponse,
    RecordedRequest, ResponseBody, Scheme, TimeUnit, Times,
};
use crate::predicate::{BodyMatcher, HttpRequest, JsonMatchType, MatchingMap, Token};
use base64::Engine as _;
use serde_json::Value;

// ============================================================================
// Tokens and collections
// ============================================================================

impl From<TokenDto> for Token {
    fn from(dto: TokenDto) -> Self {
        match dto {
            TokenDto::Plain(value) => Token::new(value),
            TokenDto::Negatable { not, value } => Token::negatable(value, not),
        }
    }
}

impl From<&Token> for TokenDto {
    fn from(token: &Token) -> Self {
        if token.is_negated() {
            TokenDto::Negatable {
                not: true,
                value: token.value().to_string(),
            }
        } else {
            TokenDto::Plain(token.value().to_string())
        }
    }
}

impl From<MultiValueCollection> for MatchingMap {
    fn from(collection: MultiValueCollection) -> Self {
        let mut map = MatchingMap::new();
        match collection {
            MultiValueCollection::List(entries) => {
                for entry in entries {
                    let key = Token::from(entry.name);
                    if entry.values.is_empty() {
                        // A bare name asserts presence with any value
                        map.put(key, Token::new(".*"));
                    } else {
                        map.put_all_values(key, entry.values.into_iter().map(Token::from));
                    }
                }
            }
            MultiValueCollection::Map(entries) => {
                for (name, values) in entries {
                    match values {
                        OneOrMany::One(value) => map.put(name, Token::from(value)),
                        OneOrMany::Many(values) => {
                            map.put_all_values(name, values.into_iter().map(Token::from))
                        }
                    }
                }
            }
        }
        map
    }
}

impl From<&MatchingMap> for MultiValueCollection {
    fn from(map: &MatchingMap) -> Self {
        MultiValueCollection::List(
            map.iter()
                .map(|(key, values)| KeyToMultiValueDto {
                    name: key.into(),
                    values: values.iter().map(TokenDto::from).collect(),
                })
                .collect(),
        )
    }
}

impl From<SingleValueCollection> for MatchingMap {
    fn from(collection: SingleValueCollection) -> Self {
        let mut map = MatchingMap::new();
        match collection {
            SingleValueCollection::List(entries) => {
                for entry in entries {
                    map.put(Token::from(entry.name), Token::from(entry.value));
                }
            }
            SingleValueCollection::Map(entries) => {
                for (name, value) in entries {
                    map.put(name, Token::from(value));
                }
            }
        }
        map
    }
}

impl From<&MatchingMap> for SingleValueCollection {
    fn from(map: &MatchingMap) -> Self {
        SingleValueCollection::List(
            map.entry_set()
                .iter()
                .map(|entry| KeyToValueDto {
                    name: entry.key().into(),
                    value: entry.value().into(),
                })
                .collect(),
        )
    }
}

// ============================================================================
// Request
// ============================================================================

impl TryFrom<BodyDto> for BodyMatcher {
    type Error = DtoError;

    fn try_from(dto: BodyDto) -> Result<Self, Self::Error> {
        Ok(match dto {
            BodyDto::Plain(value) => BodyMatcher::exact(value),
            BodyDto::Typed(TypedBodyDto::String { value, not }) => {
                BodyMatcher::Exact { value, not }
            }
            BodyDto::Typed(TypedBodyDto::Regex { value, not }) => {
                BodyMatcher::Regex(Token::negatable(value, not))
            }
            BodyDto::Typed(TypedBodyDto::Json {
                json,
                match_type,
                not,
            }) => {
                let value = match json {
                    Value::String(raw) => serde_json::from_str(&raw)
                        .map_err(|e| DtoError::InvalidJsonBody(e.to_string()))?,
                    other => other,
                };
                BodyMatcher::Json {
                    value,
                    match_type: match match_type {
                        MatchTypeDto::OnlyMatchingFields => JsonMatchType::OnlyMatchingFields,
                        MatchTypeDto::Strict => JsonMatchType::Strict,
                    },
                    not,
                }
            }
            BodyDto::Typed(TypedBodyDto::Parameters { parameters }) => {
                BodyMatcher::Parameters(parameters.into())
            }
        })
    }
}

impl From<&BodyMatcher> for BodyDto {
    fn from(body: &BodyMatcher) -> Self {
        match body {
            BodyMatcher::Exact { value, not: false } => BodyDto::Plain(value.clone()),
            BodyMatcher::Exact { value, not: true } => BodyDto::Typed(TypedBodyDto::String {
                value: value.clone(),
                not: true,
            }),
            BodyMatcher::Regex(token) => BodyDto::Typed(TypedBodyDto::Regex {
                value: token.value().to_string(),
                not: token.is_negated(),
            }),
            BodyMatcher::Json {
                value,
                match_type,
                not,
            } => BodyDto::Typed(TypedBodyDto::Json {
                json: value.clone(),
                match_type: match match_type {
                    JsonMatchType::OnlyMatchingFields => MatchTypeDto::OnlyMatchingFields,
                    JsonMatchType::Strict => MatchTypeDto::Strict,
                },
                not: *not,
            }),
            BodyMatcher::Parameters(map) => BodyDto::Typed(TypedBodyDto::Parameters {
                parameters: map.into(),
            }),
        }
    }
}

impl TryFrom<HttpRequestDto> for HttpRequest {
    type Error = DtoError;

    fn try_from(dto: HttpRequestDto) -> Result<Self, Self::Error> {
        Ok(HttpRequest {
            method: dto.method.map(Token::from).unwrap_or_default(),
            path: dto.path.map(Token::from).unwrap_or_default(),
            query: dto
                .query_string_parameters
                .map(MatchingMap::from)
                .unwrap_or_default(),
            headers: dto.headers.map(MatchingMap::from).unwrap_or_default(),
            cookies: dto.cookies.map(MatchingMap::from).unwrap_or_default(),
            body: dto.body.map(BodyMatcher::try_from).transpose()?,
        })
    }
}

impl From<&HttpRequest> for HttpRequestDto {
    fn from(request: &HttpRequest) -> Self {
        let token = |t: &Token| (!t.is_empty() || t.is_negated()).then(|| TokenDto::from(t));
        HttpRequestDto {
            method: token(&request.method),
            path: token(&request.path),
            query_string_parameters: (!request.query.is_empty()).then(|| (&request.query).into()),
            headers: (!request.headers.is_empty()).then(|| (&request.headers).into()),
            cookies: (!request.cookies.is_empty()).then(|| (&request.cookies).into()),
            body: request.body.as_ref().map(BodyDto::from),
        }
    }
}

impl From<&RecordedRequest> for RecordedRequestDto {
    fn from(recorded: &RecordedRequest) -> Self {
        RecordedRequestDto {
            request: (&recorded.request).into(),
            timestamp: recorded.received_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

impl TryFrom<HttpResponseDto> for HttpResponse {
    type Error = DtoError;

    fn try_from(dto: HttpResponseDto) -> Result<Self, Self::Error> {
        let status_code = dto.status_code.unwrap_or(200);
        if !(100..=999).contains(&status_code) {
            return Err(DtoError::InvalidStatusCode(status_code));
        }

        let headers = dto
            .headers
            .map(MatchingMap::from)
            .map(|map| {
                map.iter()
                    .map(|(name, values)| Header {
                        name: name.value().to_string(),
                        values: values.iter().map(|v| v.value().to_string()).collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let cookies = dto
            .cookies
            .map(MatchingMap::from)
            .map(|map| {
                map.entry_set()
                    .iter()
                    .map(|e| Cookie::new(e.key().value(), e.value().value()))
                    .collect()
            })
            .unwrap_or_default();

        let body = match dto.body {
            None => None,
            Some(ResponseBodyDto::Plain(text))
            | Some(ResponseBodyDto::Typed(TypedResponseBodyDto::String { value: text })) => {
                Some(ResponseBody::Text(text))
            }
            Some(ResponseBodyDto::Typed(TypedResponseBodyDto::Binary { base64_bytes })) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(base64_bytes.as_bytes())
                    .map_err(|e| DtoError::InvalidBase64(e.to_string()))?;
                Some(ResponseBody::Binary(bytes))
            }
        };

        let delay = dto.delay.map(|d| Delay {
            time_unit: match d.time_unit {
                TimeUnitDto::Milliseconds => TimeUnit::Milliseconds,
                TimeUnitDto::Seconds => TimeUnit::Seconds,
                TimeUnitDto::Minutes => TimeUnit::Minutes,
            },
            value: d.value,
        });

        Ok(HttpResponse {
            status_code,
            headers,
            cookies,
            body,
            delay,
        })
    }
}

impl From<&HttpResponse> for HttpResponseDto {
    fn from(response: &HttpResponse) -> Self {
        let headers = (!response.headers.is_empty()).then(|| {
            MultiValueCollection::List(
                response
                    .headers
                    .iter()
                    .map(|h| KeyToMultiValueDto {
                        name: TokenDto::Plain(h.name.clone()),
                        values: h.values.iter().cloned().map(TokenDto::Plain).collect(),
                    })
                    .collect(),
            )
        });
        let cookies = (!response.cookies.is_empty()).then(|| {
            SingleValueCollection::List(
                response
                    .cookies
                    .iter()
                    .map(|c| KeyToValueDto {
                        name: TokenDto::Plain(c.name.clone()),
                        value: TokenDto::Plain(c.value.clone()),
                    })
                    .collect(),
            )
        });
        let body = response.body.as_ref().map(|body| match body {
            ResponseBody::Text(text) => ResponseBodyDto::Plain(text.clone()),
            ResponseBody::Binary(bytes) => {
                ResponseBodyDto::Typed(TypedResponseBodyDto::Binary {
                    base64_bytes: base64::engine::general_purpose::STANDARD.encode(bytes),
                })
            }
        });
        let delay = response.delay.map(|d| DelayDto {
            time_unit: match d.time_unit {
                TimeUnit::Milliseconds => TimeUnitDto::Milliseconds,
                TimeUnit::Seconds => TimeUnitDto::Seconds,
                TimeUnit::Minutes => TimeUnitDto::Minutes,
            },
            value: d.value,
        });

        HttpResponseDto {
            status_code: Some(response.status_code),
            headers,
            cookies,
            body,
            delay,
        }
    }
}

impl TryFrom<HttpForwardDto> for HttpForward {
    type Error = DtoError;

    fn try_from(dto: HttpForwardDto) -> Result<Self, Self::Error> {
        if dto.host.trim().is_empty() {
            return Err(DtoError::MissingField("httpForward.host"));
        }
        Ok(HttpForward {
            host: dto.host,
            port: dto.port,
            scheme: match dto.scheme {
                SchemeDto::Http => Scheme::Http,
                SchemeDto::Https => Scheme::Https,
            },
        })
    }
}

impl From<&HttpForward> for HttpForwardDto {
    fn from(forward: &HttpForward) -> Self {
        HttpForwardDto {
            host: forward.host.clone(),
            port: forward.port,
            scheme: match forward.scheme {
                Scheme::Http => SchemeDto::Http,
                Scheme::Https => SchemeDto::Https,
            },
        }
    }
}

impl TryFrom<HttpCallbackDto> for HttpCallback {
    type Error = DtoError;

    fn try_from(dto: HttpCallbackDto) -> Result<Self, Self::Error> {
        if dto.callback_name.trim().is_empty() {
            return Err(DtoError::MissingField("httpCallback.callbackName"));
        }
        Ok(HttpCallback::new(dto.callback_name))
    }
}

// ============================================================================
// Times and expectations
// ============================================================================

impl From<TimesDto> for Times {
    fn from(dto: TimesDto) -> Self {
        if dto.unlimited {
            Times::unlimited()
        } else {
            Times::exactly(dto.remaining_times)
        }
    }
}

impl From<&Times> for TimesDto {
    fn from(times: &Times) -> Self {
        match times.remaining() {
            None => TimesDto {
                remaining_times: 0,
                unlimited: true,
            },
            Some(remaining) => TimesDto {
                remaining_times: remaining,
                unlimited: false,
            },
        }
    }
}

impl TryFrom<ExpectationDto> for Expectation {
    type Error = DtoError;

    fn try_from(dto: ExpectationDto) -> Result<Self, Self::Error> {
        let mut actions = Vec::with_capacity(1);
        if let Some(response) = dto.http_response {
            actions.push(Action::Respond(response.try_into()?));
        }
        if let Some(forward) = dto.http_forward {
            actions.push(Action::Forward(forward.try_into()?));
        }
        if let Some(callback) = dto.http_callback {
            actions.push(Action::Callback(callback.try_into()?));
        }
        if actions.len() > 1 {
            return Err(DtoError::MultipleActions(actions.len()));
        }
        let action = actions.pop().ok_or(DtoError::NoAction)?;

        let request = dto
            .http_request
            .map(HttpRequest::try_from)
            .transpose()?
            .unwrap_or_default();
        let times = dto.times.map(Times::from).unwrap_or_default();

        let expectation = Expectation::new(request, action, times);
        Ok(match dto.id {
            Some(id) if !id.is_empty() => expectation.with_id(id),
            _ => expectation,
        })
    }
}

impl From<&Expectation> for ExpectationDto {
    fn from(expectation: &Expectation) -> Self {
        let mut dto = ExpectationDto {
            id: Some(expectation.id().to_string()),
            http_request: Some(expectation.request().into()),
            times: Some(expectation.times().into()),
            ..Default::default()
        };
        match expectation.action() {
            Action::Respond(response) => dto.http_response = Some(response.into()),
            Action::Forward(forward) => dto.http_forward = Some(forward.into()),
            Action::Callback(callback) => {
                dto.http_callback = Some(HttpCallbackDto {
                    callback_name: callback.callback_name.clone(),
                })
            }
        }
        dto
    }
}
