use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use service_core::error::AppError;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::SmtpConfig;

const SENDER_NAME: &str = "Подтвердите ваш аккаунт";
const ACTIVATION_SUBJECT: &str = "Подтверждение вашей электронной почты";

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_activation_email(&self, to_email: &str, link: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from: Mailbox,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        // 465 is implicit TLS, anything else negotiates STARTTLS.
        let builder = if config.port == 465 {
            SmtpTransport::relay(&config.host)
        } else {
            SmtpTransport::starttls_relay(&config.host)
        }
        .map_err(|e| AppError::EmailError(e.to_string()))?;

        let mailer = builder
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        let from = Mailbox::new(
            Some(SENDER_NAME.to_string()),
            config
                .user
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::ConfigError(e.into()))?,
        );

        tracing::info!(host = %config.host, port = config.port, "Email service initialized");

        Ok(Self { mailer, from })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: String,
        html_body: String,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        // SmtpTransport is blocking
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => Err(AppError::EmailError(e.to_string())),
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_activation_email(&self, to_email: &str, link: &str) -> Result<(), AppError> {
        let (plain_body, html_body) = activation_bodies(link);
        self.send_email(to_email, ACTIVATION_SUBJECT, plain_body, html_body)
            .await
    }
}

/// Plain-text and HTML bodies of the activation letter.
pub fn activation_bodies(link: &str) -> (String, String) {
    let plain_body = format!(
        "Здравствуйте!\n\n\
         Спасибо за регистрацию на нашем сайте! Чтобы активировать ваш аккаунт, \
         пожалуйста, подтвердите ваш адрес электронной почты, перейдя по следующей ссылке:\n\n\
         {link}\n\n\
         Если вы не регистрировались на нашем сайте, просто проигнорируйте это письмо.\n\n\
         Если у вас возникли вопросы, не стесняйтесь обращаться к нам.\n\n\
         С уважением,\nВаша команда: SVOLOCHYO"
    );

    let html_body = format!(
        r#"<p>Здравствуйте!</p>
<p>Спасибо за регистрацию на нашем сайте! Чтобы активировать ваш аккаунт, пожалуйста, подтвердите ваш адрес электронной почты, перейдя по следующей ссылке:</p>
<p><a href="{link}">{link}</a></p>
<p>Если вы не регистрировались на нашем сайте, просто проигнорируйте это письмо.</p>
<p>Если у вас возникли вопросы, не стесняйтесь обращаться к нам.</p>
<p>С уважением,<br>Ваша команда: SVOLOCHYO</p>"#
    );

    (plain_body, html_body)
}

/// Records activation emails instead of sending them.
#[derive(Default)]
pub struct MockEmailService {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(to, link)` pairs sent so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_activation_email(&self, to_email: &str, link: &str) -> Result<(), AppError> {
        self.sent
            .lock()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Mock mailbox poisoned: {}", e)))?
            .push((to_email.to_string(), link.to_string()));
        Ok(())
    }
}
