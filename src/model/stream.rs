//! Reassembles streamed chunks into a complete response.

use super::{ModelResponse, ResponsePart, StreamChunk, Usage};
use std::collections::HashMap;
use uuid::Uuid;

/// What changed in the response after applying a chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum PartUpdate {
    /// A new part appeared at `index`.
    Start { index: usize, part: ResponsePart },
    /// More text for the text part at `index`.
    TextDelta { index: usize, delta: String },
    /// More JSON arguments for the tool call at `index`.
    ArgsDelta { index: usize, delta: String },
}

/// Accumulates stream chunks into response parts.
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    parts: Vec<ResponsePart>,
    text_index: Option<usize>,
    tool_indices: HashMap<u32, usize>,
    usage: Usage,
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one chunk and report what changed.
    pub fn push(&mut self, chunk: StreamChunk) -> Option<PartUpdate> {
        match chunk {
            StreamChunk::TextDelta(delta) => {
                if delta.is_empty() {
                    return None;
                }
                match self.text_index {
                    Some(index) => {
                        if let Some(ResponsePart::Text { content }) = self.parts.get_mut(index) {
                            content.push_str(&delta);
                        }
                        Some(PartUpdate::TextDelta { index, delta })
                    }
                    None => {
                        let index = self.parts.len();
                        let part = ResponsePart::text(delta);
                        self.parts.push(part.clone());
                        self.text_index = Some(index);
                        Some(PartUpdate::Start { index, part })
                    }
                }
            }

            StreamChunk::ToolCallDelta {
                index: stream_index,
                id,
                name,
                args_delta,
            } => match self.tool_indices.get(&stream_index) {
                Some(&index) => {
                    if let Some(ResponsePart::ToolCall {
                        tool_name, args, ..
                    }) = self.parts.get_mut(index)
                    {
                        if let Some(name) = name {
                            if tool_name.is_empty() {
                                *tool_name = name;
                            }
                        }
                        match args_delta {
                            Some(delta) if !delta.is_empty() => {
                                args.push_str(&delta);
                                return Some(PartUpdate::ArgsDelta { index, delta });
                            }
                            _ => {}
                        }
                    }
                    None
                }
                None => {
                    let index = self.parts.len();
                    let part = ResponsePart::tool_call(
                        name.unwrap_or_default(),
                        args_delta.unwrap_or_default(),
                        id.unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple())),
                    );
                    self.parts.push(part.clone());
                    self.tool_indices.insert(stream_index, index);
                    Some(PartUpdate::Start { index, part })
                }
            },

            StreamChunk::Usage(usage) => {
                self.usage.incr(&usage);
                None
            }
        }
    }

    /// Finish the response. A stream without usage still counts as one request.
    pub fn finish(self, model_name: &str) -> ModelResponse {
        let mut usage = self.usage;
        if usage.requests == 0 {
            usage.requests = 1;
        }
        ModelResponse {
            parts: self.parts,
            model_name: model_name.to_string(),
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_deltas_accumulate() {
        let mut assembler = ResponseAssembler::new();

        let first = assembler.push(StreamChunk::TextDelta("Hello".to_string()));
        assert!(matches!(first, Some(PartUpdate::Start { index: 0, .. })));

        let second = assembler.push(StreamChunk::TextDelta(" world".to_string()));
        assert_eq!(
            second,
            Some(PartUpdate::TextDelta {
                index: 0,
                delta: " world".to_string()
            })
        );

        assert!(assembler
            .push(StreamChunk::TextDelta(String::new()))
            .is_none());

        let response = assembler.finish("test");
        assert_eq!(response.text().as_deref(), Some("Hello world"));
        assert_eq!(response.usage.requests, 1);
    }

    #[test]
    fn test_tool_call_args_stream_in() {
        let mut assembler = ResponseAssembler::new();

        assembler.push(StreamChunk::ToolCallDelta {
            index: 0,
            id: Some("call_1".to_string()),
            name: Some("weather_forecast".to_string()),
            args_delta: Some("{\"location\":".to_string()),
        });
        let update = assembler.push(StreamChunk::ToolCallDelta {
            index: 0,
            id: None,
            name: None,
            args_delta: Some(" \"Nairobi\"}".to_string()),
        });
        assert!(matches!(update, Some(PartUpdate::ArgsDelta { index: 0, .. })));

        let response = assembler.finish("gpt");
        let calls = response.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args_as_value().unwrap()["location"], "Nairobi");
    }

    #[test]
    fn test_parallel_tool_calls_keep_order() {
        let mut assembler = ResponseAssembler::new();
        for (i, name) in ["roll_die", "get_player_name"].iter().enumerate() {
            assembler.push(StreamChunk::ToolCallDelta {
                index: i as u32,
                id: None,
                name: Some(name.to_string()),
                args_delta: Some("{}".to_string()),
            });
        }

        let response = assembler.finish("gpt");
        let names: Vec<_> = response
            .tool_calls()
            .iter()
            .map(|p| match p {
                ResponsePart::ToolCall { tool_name, .. } => tool_name.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["roll_die", "get_player_name"]);
    }
}
