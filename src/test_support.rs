//! In-memory device and classifier doubles for unit tests.
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::{SeeDroidError, SeeDroidResult};
use crate::executor::input::{InputDelivery, Key};
use crate::llm::provider::Classifier;
use crate::perception::traits::ScreenCapture;
use crate::perception::types::ScreenSize;

pub fn hierarchy(nodes: &[&str]) -> String {
    let body: String = nodes.iter().map(|n| format!("<node {n} />")).collect();
    format!("<?xml version='1.0' encoding='UTF-8' standalone='yes' ?><hierarchy rotation=\"0\">{body}</hierarchy>")
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

/// Device whose screen is a fixed tree; every side effect is logged.
pub struct StubDevice {
    pub tree: Mutex<String>,
    pub size: ScreenSize,
    pub image: Vec<u8>,
    pub fail_capture: bool,
    pub fail_input: bool,
    pub events: Mutex<Vec<String>>,
}

impl StubDevice {
    pub fn new(tree: String) -> Self {
        Self {
            tree: Mutex::new(tree),
            size: ScreenSize::new(1080, 1920),
            image: png(540, 960),
            fail_capture: false,
            fail_input: false,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: String) -> SeeDroidResult<()> {
        if self.fail_input {
            return Err(SeeDroidError::Device(format!("{event} rejected")));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[async_trait]
impl ScreenCapture for StubDevice {
    async fn screenshot(&self) -> SeeDroidResult<Vec<u8>> {
        if self.fail_capture {
            return Err(SeeDroidError::Capture("offline".into()));
        }
        self.events.lock().unwrap().push("screenshot".into());
        Ok(self.image.clone())
    }

    async fn ui_tree(&self) -> SeeDroidResult<String> {
        if self.fail_capture {
            return Err(SeeDroidError::Capture("offline".into()));
        }
        Ok(self.tree.lock().unwrap().clone())
    }

    async fn screen_size(&self) -> SeeDroidResult<ScreenSize> {
        if self.fail_capture {
            return Err(SeeDroidError::Capture("offline".into()));
        }
        Ok(self.size)
    }
}

#[async_trait]
impl InputDelivery for StubDevice {
    async fn tap(&self, x: i32, y: i32) -> SeeDroidResult<()> {
        self.record(format!("tap {x} {y}"))
    }

    async fn swipe(&self, x1: i32, y1: i32, x2: i32, y2: i32, duration_ms: u64) -> SeeDroidResult<()> {
        self.record(format!("swipe {x1} {y1} {x2} {y2} {duration_ms}"))
    }

    async fn send_text(&self, text: &str) -> SeeDroidResult<()> {
        self.record(format!("text {text}"))
    }

    async fn press_key(&self, key: Key) -> SeeDroidResult<()> {
        self.record(format!("key {}", key.keycode()))
    }

    async fn launch_app(&self, package: &str) -> SeeDroidResult<()> {
        self.record(format!("launch {package}"))
    }

    async fn stop_app(&self, package: &str) -> SeeDroidResult<()> {
        self.record(format!("stop {package}"))
    }
}

/// Replays queued answers in order, then repeats `fallback`.
pub struct ScriptedClassifier {
    answers: Mutex<VecDeque<SeeDroidResult<String>>>,
    fallback: String,
    pub calls: Mutex<Vec<(String, bool)>>,
}

impl ScriptedClassifier {
    pub fn new(answers: Vec<SeeDroidResult<String>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            fallback: "-1".into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(answer: &str) -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            fallback: answer.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn saw_images(&self) -> Vec<bool> {
        self.calls.lock().unwrap().iter().map(|(_, img)| *img).collect()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn generate(&self, prompt: &str, image: Option<&[u8]>) -> SeeDroidResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), image.is_some()));
        match self.answers.lock().unwrap().pop_front() {
            Some(answer) => answer,
            None => Ok(self.fallback.clone()),
        }
    }
}
