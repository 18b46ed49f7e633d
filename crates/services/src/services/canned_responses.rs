//! Offline replies used when no generative-text API key is configured or the
//! API call fails. Selection is plain keyword matching on lowercased input.

/// A canned answer chosen when any of its keywords appears in the input.
struct CannedReply {
    keywords: &'static [&'static str],
    text: &'static str,
}

const DIAGNOSES: &[CannedReply] = &[
    CannedReply {
        keywords: &["water", "liquid", "wet", "spill", "rain"],
        text: "Liquid exposure can corrode the logic board and connectors. Power the device \
               off and do not charge it. A technician will open it, clean affected areas with \
               isopropyl alcohol and test the board; parts with corrosion damage may need \
               replacement.",
    },
    CannedReply {
        keywords: &["screen", "display", "crack", "shatter", "touch", "lcd", "oled"],
        text: "The symptoms point to a damaged display assembly or digitizer. A screen \
               replacement usually fixes cracks, dead touch zones and flickering. The \
               technician will also check the display connector in case the panel itself is \
               fine.",
    },
    CannedReply {
        keywords: &["battery", "drain", "dies", "swollen", "shut down", "shuts off"],
        text: "This looks like a worn or faulty battery. Batteries lose capacity after a few \
               hundred charge cycles, which causes fast drain and sudden shutdowns. A battery \
               health test will confirm it; replacement is the usual fix. Stop using the \
               device if the battery is swollen.",
    },
    CannedReply {
        keywords: &["charg", "port", "cable", "plug"],
        text: "Charging problems are most often caused by lint in the charging port, a \
               damaged cable or a worn port. The technician will clean and inspect the port \
               and replace it if the contacts are damaged.",
    },
    CannedReply {
        keywords: &["camera", "lens", "blurry", "photo"],
        text: "Camera faults usually come from a scratched lens cover or a failing camera \
               module. The technician will inspect the lens and test the module; \
               replacement of the affected part normally resolves it.",
    },
    CannedReply {
        keywords: &["speaker", "microphone", "mic", "audio", "sound", "hear"],
        text: "Audio issues are commonly caused by debris in the speaker or microphone mesh, \
               or a failed audio component. Cleaning fixes many cases; otherwise the speaker \
               or microphone module is replaced.",
    },
    CannedReply {
        keywords: &["slow", "freeze", "crash", "software", "boot", "update", "virus"],
        text: "This sounds like a software problem. A backup, system update and, if needed, \
               a clean reinstall of the operating system usually resolve freezes and boot \
               loops. The technician will also check storage health.",
    },
];

const DEFAULT_DIAGNOSIS: &str = "Thanks for the details. A technician will run a full \
    hardware and software check to pinpoint the fault and send you a quote before any work \
    starts.";

const SUPPORT_REPLIES: &[CannedReply] = &[
    CannedReply {
        keywords: &["human", "agent", "person", "someone", "representative"],
        text: "I've let our support team know you'd like to talk to a person. Someone will \
               reply here shortly.",
    },
    CannedReply {
        keywords: &["repair", "fix", "broken", "screen", "battery"],
        text: "You can book a repair from the Repair page. Describe the issue and you'll get \
               an instant diagnosis; a technician then confirms the quote before starting.",
    },
    CannedReply {
        keywords: &["order", "shipping", "delivery", "track", "shipped"],
        text: "You can follow your orders from the Orders tab in your dashboard. Orders ship \
               within one business day.",
    },
    CannedReply {
        keywords: &["price", "cost", "quote", "how much", "expensive"],
        text: "Repair prices depend on the device and the part. After you submit a repair \
               request the technician adds an estimated cost to the job before any work \
               begins.",
    },
    CannedReply {
        keywords: &["warranty", "guarantee", "return", "refund"],
        text: "All repairs come with a 90-day warranty on parts and labour. Products can be \
               returned within 14 days in their original condition.",
    },
    CannedReply {
        keywords: &["hours", "open", "location", "address", "where"],
        text: "Our store is open Monday to Saturday, 9:00 to 18:00. The address is on the \
               Contact page.",
    },
    CannedReply {
        keywords: &["hello", "hi", "hey", "good morning", "good evening"],
        text: "Hi! I'm the BLUCELL assistant. I can help with repairs, orders, prices and \
               warranty questions.",
    },
];

const DEFAULT_SUPPORT_REPLY: &str = "I'm not sure I understood that. I can help with \
    repairs, orders, prices and warranty questions, or you can ask to talk to a person.";

fn first_match(replies: &[CannedReply], input: &str) -> Option<&'static str> {
    let input = input.to_lowercase();
    replies
        .iter()
        .find(|reply| reply.keywords.iter().any(|k| contains_keyword(&input, k)))
        .map(|reply| reply.text)
}

/// Multi-word keywords and stems match as substrings; short words must match a whole word.
fn contains_keyword(input: &str, keyword: &str) -> bool {
    if keyword.contains(' ') || keyword.len() > 4 || keyword == "charg" {
        return input.contains(keyword);
    }
    input
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == keyword)
}

pub fn fallback_diagnosis(issue_description: &str) -> &'static str {
    first_match(DIAGNOSES, issue_description).unwrap_or(DEFAULT_DIAGNOSIS)
}

pub fn fallback_support_reply(message: &str) -> &'static str {
    first_match(SUPPORT_REPLIES, message).unwrap_or(DEFAULT_SUPPORT_REPLY)
}

/// True when the customer is asking to be handed over to a person.
pub fn asks_for_human(message: &str) -> bool {
    first_match(&SUPPORT_REPLIES[..1], message).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnosis_by_keyword() {
        assert!(fallback_diagnosis("My screen is CRACKED").contains("display"));
        assert!(fallback_diagnosis("phone fell in water").contains("Liquid"));
        assert!(fallback_diagnosis("won't charge anymore").contains("charging port"));
        assert_eq!(fallback_diagnosis("it makes a weird smell"), DEFAULT_DIAGNOSIS);
    }

    #[test]
    fn liquid_damage_wins_over_screen() {
        assert!(fallback_diagnosis("dropped in water and the screen flickers").contains("Liquid"));
    }

    #[test]
    fn short_keywords_match_whole_words_only() {
        // "hi" must not match inside "shipping"
        assert!(fallback_support_reply("where is my shipping update").contains("Orders"));
        assert!(fallback_support_reply("hi there").starts_with("Hi!"));
        assert_eq!(fallback_support_reply("qwerty"), DEFAULT_SUPPORT_REPLY);
    }

    #[test]
    fn human_handover_detection() {
        assert!(asks_for_human("Can I talk to a human please?"));
        assert!(!asks_for_human("How much is a battery?"));
    }
}
