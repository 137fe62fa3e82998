//! Chat templates per model family
//!
//! Instruction-tuned models expect their system and user turns wrapped in
//! family-specific delimiter tokens. The template is picked by matching a
//! family hint (usually the model path or id) against [`CHAT_TEMPLATES`];
//! supporting a new family means adding one entry to the table.

/// Delimiters that wrap the system and user turns for one model family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatTemplate {
    /// Family name for logging
    pub family: &'static str,
    /// Lowercase substrings that select this template
    pub match_tokens: &'static [&'static str],
    /// Emitted before the system instruction
    pub prefix: &'static str,
    /// Emitted between the system instruction and the user turn
    pub separator: &'static str,
    /// Emitted after the user turn, opening the assistant turn
    pub suffix: &'static str,
    /// Sequences that end the assistant turn
    pub stop_sequences: &'static [&'static str],
}

impl ChatTemplate {
    /// Wrap a system instruction and a user message in this family's delimiters
    pub fn render(&self, system: &str, user: &str) -> String {
        let mut out = String::with_capacity(
            self.prefix.len() + system.len() + self.separator.len() + user.len() + self.suffix.len(),
        );
        out.push_str(self.prefix);
        out.push_str(system);
        out.push_str(self.separator);
        out.push_str(user);
        out.push_str(self.suffix);
        out
    }

    /// Stop sequences as owned strings, for backends that take `Vec<String>`
    pub fn stop_tokens(&self) -> Vec<String> {
        self.stop_sequences.iter().map(|s| (*s).to_string()).collect()
    }

    pub fn is_generic(&self) -> bool {
        self.match_tokens.is_empty()
    }
}

/// Known families, checked in order. First match wins.
pub const CHAT_TEMPLATES: &[ChatTemplate] = &[
    ChatTemplate {
        family: "llama3",
        match_tokens: &["llama-3", "llama3"],
        prefix: "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n",
        separator: "<|eot_id|><|start_header_id|>user<|end_header_id|>\n\n",
        suffix: "<|eot_id|><|start_header_id|>assistant<|end_header_id|>\n\n",
        stop_sequences: &["<|eot_id|>"],
    },
    ChatTemplate {
        family: "mistral",
        match_tokens: &["mistral"],
        prefix: "[INST] ",
        separator: "\n\n",
        suffix: " [/INST]",
        stop_sequences: &["</s>"],
    },
    ChatTemplate {
        family: "phi",
        match_tokens: &["phi"],
        prefix: "<|system|>\n",
        separator: "<|end|>\n<|user|>\n",
        suffix: "<|end|>\n<|assistant|>\n",
        stop_sequences: &["<|end|>", "<|endoftext|>"],
    },
    ChatTemplate {
        family: "gemma",
        match_tokens: &["gemma"],
        prefix: "<start_of_turn>user\n",
        separator: "\n\n",
        suffix: "<end_of_turn>\n<start_of_turn>model\n",
        stop_sequences: &["<end_of_turn>"],
    },
    ChatTemplate {
        family: "qwen",
        match_tokens: &["qwen"],
        prefix: "<|im_start|>system\n",
        separator: "<|im_end|>\n<|im_start|>user\n",
        suffix: "<|im_end|>\n<|im_start|>assistant\n",
        stop_sequences: &["<|im_end|>", "<|endoftext|>"],
    },
];

/// Fallback for unrecognized families: plain instruction followed by "Response:"
pub const GENERIC_TEMPLATE: ChatTemplate = ChatTemplate {
    family: "generic",
    match_tokens: &[],
    prefix: "",
    separator: "\n\n",
    suffix: "\n\nResponse:",
    stop_sequences: &[],
};

/// Select the chat template for a family hint (case-insensitive substring match)
pub fn template_for(family_hint: &str) -> &'static ChatTemplate {
    let hint = family_hint.to_lowercase();
    CHAT_TEMPLATES
        .iter()
        .find(|t| t.match_tokens.iter().any(|token| hint.contains(token)))
        .unwrap_or(&GENERIC_TEMPLATE)
}
