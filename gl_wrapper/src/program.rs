use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{error, info, warn};
use thiserror::Error;

use crate::backend::{GlBackend, ShaderStage};

/// Resolved uniform slot, `-1` when the linked program has no such uniform.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UniformLocation(i32);

impl UniformLocation {
    pub const NOT_FOUND: Self = Self(-1);

    pub fn get(&self) -> i32 {
        self.0
    }

    pub fn is_found(&self) -> bool {
        self.0 >= 0
    }
}

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("Could not allocate {0} object")]
    Allocation(&'static str),
}

struct Shader<B: GlBackend> {
    backend: Rc<B>,
    id: u32,
    stage: ShaderStage,
    compiled: bool,
}

impl<B: GlBackend> Drop for Shader<B> {
    fn drop(&mut self) {
        self.backend.delete_shader(self.id);
    }
}

/// Linked combination of shader stages.
///
/// Stages are attached whether or not they compiled, so a broken stage still
/// shows up in the link diagnostics. Nothing here ever fails on bad shader
/// code, the program just stays unlinked.
pub struct Program<B: GlBackend> {
    backend: Rc<B>,
    id: u32,
    linked: bool,
    uniforms: HashMap<String, UniformLocation>,
    // dropped after the program itself is deleted
    shaders: Vec<Shader<B>>,
}

impl<B: GlBackend> Program<B> {
    pub fn new(backend: Rc<B>) -> Result<Self, ProgramError> {
        let id = backend.create_program();
        if id == 0 {
            return Err(ProgramError::Allocation("program"));
        }

        Ok(Self {
            backend,
            id,
            linked: false,
            uniforms: HashMap::new(),
            shaders: Vec::new(),
        })
    }

    pub fn get_id(&self) -> u32 {
        self.id
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Reads `path` and compiles it as `stage`.
    ///
    /// An unreadable file is logged and compiled as empty source, which then
    /// fails with the compiler's own diagnostic. Returns whether the stage
    /// compiled.
    pub fn load_stage<P: AsRef<Path>>(
        &mut self,
        path: P,
        stage: ShaderStage,
    ) -> Result<bool, ProgramError> {
        let path = path.as_ref();

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                warn!("Failed to load shader source file {:?}: {e}", path);
                String::new()
            }
        };

        self.compile_stage(&source, stage)
    }

    pub fn compile_stage(
        &mut self,
        source: &str,
        stage: ShaderStage,
    ) -> Result<bool, ProgramError> {
        let gl = &self.backend;

        let id = gl.create_shader(stage);
        if id == 0 {
            return Err(ProgramError::Allocation("shader"));
        }

        gl.shader_source(id, source);
        gl.compile_shader(id);
        gl.attach_shader(self.id, id);

        let compiled = gl.shader_compile_status(id);
        let log = gl.shader_info_log(id);

        if compiled {
            if !log.is_empty() {
                info!("{} shader: {log}", stage.name());
            }
        } else {
            error!("{} shader failed to compile: {log}", stage.name());
        }

        self.shaders.push(Shader {
            backend: Rc::clone(&self.backend),
            id,
            stage,
            compiled,
        });

        Ok(compiled)
    }

    /// Links attached stages, the outcome is only recorded and logged.
    pub fn link(&mut self) -> bool {
        self.backend.link_program(self.id);

        self.linked = self.backend.program_link_status(self.id);
        self.uniforms.clear();

        let log = self.backend.program_info_log(self.id);
        if self.linked {
            info!("Program {} linked: {:?}", self.id, log);
        } else {
            let failed: Vec<&str> = self
                .shaders
                .iter()
                .filter(|s| !s.compiled)
                .map(|s| s.stage.name())
                .collect();
            error!(
                "Program {} failed to link (uncompiled stages: {:?}): {}",
                self.id, failed, log
            );
        }

        self.linked
    }

    pub fn uniform_location(&mut self, name: &str) -> UniformLocation {
        if let Some(location) = self.uniforms.get(name) {
            return *location;
        }

        let location = match self.backend.uniform_location(self.id, name) {
            l if l >= 0 => UniformLocation(l),
            _ => UniformLocation::NOT_FOUND,
        };

        if !location.is_found() {
            warn!("Uniform {name:?} not found in program {}", self.id);
        }

        self.uniforms.insert(name.to_string(), location);
        location
    }

    /// Program has to be in use, writes to a missing uniform are dropped.
    pub fn set_uniform_f32(&self, location: UniformLocation, value: f32) {
        if location.is_found() {
            self.backend.uniform_1f(location.get(), value);
        }
    }
}

impl<B: GlBackend> Drop for Program<B> {
    fn drop(&mut self) {
        self.backend.delete_program(self.id);
    }
}

enum StageSource {
    File(PathBuf),
    Inline(String),
}

pub struct ProgramBuilder<B: GlBackend> {
    backend: Rc<B>,
    stages: Vec<(StageSource, ShaderStage)>,
}

impl<B: GlBackend> ProgramBuilder<B> {
    pub fn new(backend: Rc<B>) -> Self {
        Self {
            backend,
            stages: Vec::new(),
        }
    }

    pub fn with_stage_file<P: Into<PathBuf>>(mut self, path: P, stage: ShaderStage) -> Self {
        self.stages.push((StageSource::File(path.into()), stage));
        self
    }

    pub fn with_stage_source(mut self, source: &str, stage: ShaderStage) -> Self {
        self.stages
            .push((StageSource::Inline(source.to_string()), stage));
        self
    }

    /// Compiles every stage and links. Only allocation failures are errors.
    pub fn build(self) -> Result<Program<B>, ProgramError> {
        let mut program = Program::new(self.backend)?;

        for (source, stage) in &self.stages {
            match source {
                StageSource::File(path) => program.load_stage(path, *stage)?,
                StageSource::Inline(src) => program.compile_stage(src, *stage)?,
            };
        }

        program.link();

        Ok(program)
    }
}
