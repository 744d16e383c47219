use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::SystemTime;

const SPARKS: [char; 6] = ['*', '+', '✦', '✧', '★', '·'];

/// What the user is being cheered for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Milestone {
    Mastered(String),
    Promotion(String),
    AllMastered,
}

impl Milestone {
    pub fn banner(&self) -> String {
        match self {
            Milestone::Mastered(word) => format!("{} MASTERED!", word.to_uppercase()),
            Milestone::Promotion(tier) => format!("LEVEL UP: {}!", tier.to_uppercase()),
            Milestone::AllMastered => "ALL WORDS MASTERED!".to_string(),
        }
    }

    fn duration(&self) -> f64 {
        match self {
            Milestone::AllMastered => 5.0,
            _ => 3.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub symbol: char,
    pub color_index: usize,
    pub age: f64,
    pub max_age: f64,
    /// Banner letters fly to a fixed spot and stay there
    pub target: Option<(f64, f64)>,
}

impl Particle {
    fn spark(x: f64, y: f64, rng: &mut ThreadRng) -> Self {
        Self {
            x,
            y,
            vel_x: rng.gen_range(-3.0..3.0),
            vel_y: rng.gen_range(-4.0..-1.0),
            symbol: *SPARKS.choose(rng).unwrap_or(&'*'),
            color_index: rng.gen_range(0..7),
            age: 0.0,
            max_age: rng.gen_range(2.0..4.0),
            target: None,
        }
    }

    fn letter(from: (f64, f64), to: (f64, f64), symbol: char, rng: &mut ThreadRng) -> Self {
        Self {
            x: from.0,
            y: from.1,
            vel_x: to.0 - from.0,
            vel_y: to.1 - from.1,
            symbol,
            color_index: rng.gen_range(0..7),
            age: 0.0,
            max_age: rng.gen_range(3.0..5.0),
            target: Some(to),
        }
    }

    pub fn is_letter(&self) -> bool {
        self.target.is_some()
    }

    fn update(&mut self, dt: f64) -> bool {
        match self.target {
            Some((tx, ty)) => {
                let dist = ((tx - self.x).powi(2) + (ty - self.y).powi(2)).sqrt();
                if dist > 1.0 {
                    self.x += self.vel_x * dt;
                    self.y += self.vel_y * dt;
                    self.vel_x *= 0.95;
                    self.vel_y *= 0.95;
                } else {
                    self.x = tx;
                    self.y = ty;
                    self.vel_x = 0.0;
                    self.vel_y = 0.0;
                }
            }
            None => {
                self.x += self.vel_x * dt;
                self.y += self.vel_y * dt;
                self.vel_y += 15.0 * dt;
            }
        }
        self.age += dt;
        self.age < self.max_age
    }
}

/// Particle burst drawn over the drill screen
#[derive(Debug)]
pub struct Celebration {
    pub particles: Vec<Particle>,
    pub milestone: Option<Milestone>,
    start_time: SystemTime,
    duration: f64,
    width: f64,
    height: f64,
}

impl Celebration {
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
            milestone: None,
            start_time: SystemTime::now(),
            duration: 3.0,
            width: 80.0,
            height: 24.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.milestone.is_some()
    }

    pub fn start(&mut self, width: u16, height: u16, milestone: Milestone) {
        let mut rng = rand::thread_rng();
        self.particles.clear();
        self.start_time = SystemTime::now();
        self.duration = milestone.duration();
        self.width = width as f64;
        self.height = height as f64;

        let cx = self.width / 2.0;
        let cy = self.height / 2.0;

        let banner = milestone.banner();
        let spacing = if banner.chars().count() * 2 < width as usize {
            2.0
        } else {
            1.0
        };
        let span = (banner.chars().count() as f64 - 1.0) * spacing;
        let left = cx - span / 2.0;
        for (i, ch) in banner.chars().enumerate() {
            if ch == ' ' {
                continue;
            }
            let from = (cx + rng.gen_range(-10.0..10.0), cy + rng.gen_range(-5.0..5.0));
            let to = (left + i as f64 * spacing, cy - 2.0);
            self.particles.push(Particle::letter(from, to, ch, &mut rng));
        }

        let sparks = if milestone == Milestone::AllMastered { 60 } else { 25 };
        for _ in 0..sparks {
            let x = cx + rng.gen_range(-15.0..15.0);
            let y = cy + rng.gen_range(-8.0..8.0);
            self.particles.push(Particle::spark(x, y, &mut rng));
        }

        self.milestone = Some(milestone);
    }

    pub fn update(&mut self) {
        if self.milestone.is_none() {
            return;
        }

        let elapsed = self.start_time.elapsed().unwrap_or_default().as_secs_f64();
        if elapsed >= self.duration {
            self.milestone = None;
            self.particles.clear();
            return;
        }

        let (width, height) = (self.width, self.height);
        self.particles.retain_mut(|p| {
            let alive = p.update(0.1);
            if p.is_letter() {
                return alive;
            }
            let margin = 5.0;
            let gone = p.y > height + margin || p.x < -margin || p.x > width + margin;
            alive && !gone
        });
    }

    pub fn stop(&mut self) {
        self.milestone = None;
        self.particles.clear();
    }
}

impl Default for Celebration {
    fn default() -> Self {
        Self::new()
    }
}
