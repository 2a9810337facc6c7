//! Offline interview script used when no reply endpoint is configured

use mock_interview_core::InterviewerReply;

pub fn script() -> Vec<InterviewerReply> {
    vec![
        InterviewerReply::new(
            "Welcome to your case interview. Our client is a regional coffee chain \
             whose profits fell by 20% over the last two years. How would you approach this?",
        ),
        InterviewerReply::new(concat!(
            r#"<EXHIBIT>{"title":"Cost per Cup","type":"table","data":{"columns":["Item","2022","2024"],"rows":[["Beans","$0.40","$0.55"],["Labor","$0.90","$1.10"],["Rent","$0.30","$0.32"]]}}</EXHIBIT>"#,
            "Good structure. Here is the cost breakdown per cup. What stands out to you?"
        )),
        InterviewerReply::new(concat!(
            "Right, labor is the biggest driver. ",
            r#"<EXHIBIT>{"title":"Cups Sold per Store (thousands)","type":"bar","data":[{"label":"2022","value":210},{"label":"2023","value":195},{"label":"2024","value":182}]}</EXHIBIT>"#,
            "Volume is also declining. What would you recommend to the client?"
        )),
        InterviewerReply::closing(
            "Thank you. That is a reasonable recommendation. That concludes our interview.",
        ),
    ]
}
