// src/llm/prompts.rs

// Prompt text for the model-backed tasks. Replies are shown to the user as-is.

pub fn code_analysis(code: &str) -> String {
    format!(
        r#"You are a secure code reviewer who follows the OWASP Secure Coding Practices.
Review the code below (it may be written in any language) and answer in this format:

1. Is the code secure? (Yes / No)
2. Identified vulnerabilities, with line references where possible.
3. Why each vulnerability is dangerous.
4. OWASP secure coding practices that are missing or violated.
5. Attacks that could exploit the code (for example SQL injection, XSS, IDOR).
6. A secure version of the code, with comments marking what was changed and
   which libraries, techniques or patterns were used.

Only discuss the security of the submitted code.

CODE:
{code}
"#
    )
}

pub fn phishing_check(message: &str) -> String {
    format!(
        r#"You are a phishing detection analyst. Decide whether the email or text
message below is a phishing attempt and answer in this format:

1. Is this a phishing message? (Yes / No)
2. Suspicious elements: urgency, tone, links, sender names, grammar, requests
   for personal or financial information.
3. Reasoning for the verdict.
4. What the recipient should do now.
5. At least three tips for spotting similar messages in the future.

MESSAGE:
"""
{message}
"""
"#
    )
}
