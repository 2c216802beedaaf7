// 回复文字

use crate::models::{RegistrationWithSession, VisitRegistration, VisitSession};

pub fn sessions_text(sessions: &[VisitSession]) -> String {
    if sessions.is_empty() {
        return "目前没有开放报名的场次".to_string();
    }
    let lines = sessions
        .iter()
        .map(|s| {
            let availability = if s.remaining_seats > 0 {
                format!("剩余 {}/{} 位", s.remaining_seats, s.total_seats)
            } else {
                "已额满".to_string()
            };
            format!("{} {}｜{}（场次 {}）", s.date, s.time, availability, s.id)
        })
        .collect::<Vec<_>>();
    format!("开放报名场次：\n{}", lines.join("\n"))
}

pub fn registrations_text(registrations: &[RegistrationWithSession]) -> String {
    if registrations.is_empty() {
        return "您目前没有有效的报名".to_string();
    }
    let lines = registrations
        .iter()
        .map(|r| {
            format!(
                "{} {}｜{} 位｜{}（报名编号 {}）",
                r.session.date,
                r.session.time,
                r.registration.visitors,
                r.registration.name,
                r.registration.id
            )
        })
        .collect::<Vec<_>>();
    format!("您的报名：\n{}", lines.join("\n"))
}

pub fn registered_text(registration_id: &str, session: Option<&VisitSession>) -> String {
    match session {
        Some(s) => format!(
            "报名成功！\n场次：{} {}\n报名编号：{}",
            s.date, s.time, registration_id
        ),
        None => format!("报名成功！报名编号：{}", registration_id),
    }
}

pub fn cancelled_text(registration: &VisitRegistration) -> String {
    format!(
        "已取消报名（编号 {}），释出 {} 个名额",
        registration.id, registration.visitors
    )
}
