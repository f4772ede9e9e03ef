//! Canned starter prompts, one per analysis category, for first-time users.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExamplePrompt {
    /// Short key used to select the prompt (e.g. "phone").
    pub key: &'static str,
    /// Chip label shown next to the key.
    pub label: &'static str,
    /// The full message filled into the composer.
    pub text: &'static str,
}

pub const EXAMPLE_PROMPTS: &[ExamplePrompt] = &[
    ExamplePrompt {
        key: "semantic",
        label: "Email looks suspicious",
        text: "I got this email saying my account will be closed unless I click a link and verify my information. Is this a scam?",
    },
    ExamplePrompt {
        key: "phone",
        label: "Phone number asks for bank info",
        text: "This phone number +1 (347) 555-0199 keeps calling and asking for my bank details. Is it a scam?",
    },
    ExamplePrompt {
        key: "bank",
        label: "Refundable deposit request",
        text: "Someone asked me to transfer a 'refundable deposit' to this bank account: 123-456-789. Could this be a scam?",
    },
    ExamplePrompt {
        key: "phish",
        label: "Is this URL phishing?",
        text: "Is this URL safe or a phishing attempt? http://bit.ly/secure-account-verify",
    },
    ExamplePrompt {
        key: "malware",
        label: "APK file safe?",
        text: "A stranger sent me a file named invoice_update.apk and told me to install it to view the invoice. Is it malware?",
    },
    ExamplePrompt {
        key: "api",
        label: "API key in Google Form",
        text: "A vendor wants API access and asked me to paste my API key into a Google Form. Is that a scam practice?",
    },
];

/// Looks a prompt up by its key.
pub fn example_by_key(key: &str) -> Option<&'static ExamplePrompt> {
    EXAMPLE_PROMPTS.iter().find(|p| p.key == key)
}
