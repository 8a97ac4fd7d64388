// src/instructions/tests.rs

//! Tests for decoding quaternary instruction lines and executing them
//! against a recording context with a stub kernel.

#[cfg(test)]
mod quaternary_instruction_tests {
    use std::cell::RefCell;
    use std::sync::Arc;

    use crate::config::InstructionFormat;
    use crate::context::{Data, ExecutionContext, LocalVariableMap, ScalarObject};
    use crate::error::{KernelError, QuaternaryError};
    use crate::instructions::operand::DataType;
    use crate::instructions::operator::{OperatorFamily, QuaternaryOp, WSigmoidType, WeightsType};
    use crate::instructions::quaternary::{is_quaternary_opcode, QuaternaryInstruction};
    use crate::kernels::{CpuKernel, QuaternaryKernel};
    use crate::matrix::MatrixBlock;
    use crate::config::RuntimeConfig;

    #[derive(Clone, Debug, PartialEq)]
    enum Event {
        Acquire(String),
        Release(String),
        BindScalar(String),
        BindMatrix(String),
    }

    // Wraps a real variable map and records every call made by the executor
    struct RecordingContext {
        inner: LocalVariableMap,
        events: Vec<Event>,
    }

    impl RecordingContext {
        fn with_matrices(names: &[&str], rows: usize, cols: usize) -> Self {
            let mut inner = LocalVariableMap::new();
            for name in names {
                inner.set_matrix_output(name, MatrixBlock::new(rows, cols)).unwrap();
            }
            Self { inner, events: Vec::new() }
        }

        fn acquired(&self) -> Vec<&str> {
            self.events.iter().filter_map(|e| match e {
                Event::Acquire(n) => Some(n.as_str()),
                _ => None,
            }).collect()
        }

        fn released(&self) -> Vec<&str> {
            self.events.iter().filter_map(|e| match e {
                Event::Release(n) => Some(n.as_str()),
                _ => None,
            }).collect()
        }

        fn binds(&self) -> Vec<&Event> {
            self.events.iter()
                .filter(|e| matches!(e, Event::BindScalar(_) | Event::BindMatrix(_)))
                .collect()
        }
    }

    impl ExecutionContext for RecordingContext {
        fn get_matrix_input(&mut self, name: &str) -> Result<Arc<MatrixBlock>, QuaternaryError> {
            self.events.push(Event::Acquire(name.to_string()));
            self.inner.get_matrix_input(name)
        }

        fn release_matrix_input(&mut self, name: &str) {
            self.events.push(Event::Release(name.to_string()));
            self.inner.release_matrix_input(name);
        }

        fn set_variable(&mut self, name: &str, data: Data) -> Result<(), QuaternaryError> {
            let event = match &data {
                Data::Matrix(_) => Event::BindMatrix(name.to_string()),
                Data::Scalar(_) => Event::BindScalar(name.to_string()),
            };
            self.events.push(event);
            self.inner.set_variable(name, data)
        }
    }

    #[derive(Debug)]
    struct Call {
        has_m4: bool,
        num_threads: i32,
    }

    // Echoes m1 for matrix operators and 42 for scalar ones
    #[derive(Default)]
    struct StubKernel {
        calls: RefCell<Vec<Call>>,
        fail: bool,
    }

    impl QuaternaryKernel for StubKernel {
        fn compute(
            &self,
            op: &crate::instructions::QuaternaryOperator,
            m1: &MatrixBlock,
            _m2: &MatrixBlock,
            _m3: &MatrixBlock,
            m4: Option<&MatrixBlock>,
            mut out: MatrixBlock,
            num_threads: i32,
        ) -> Result<MatrixBlock, KernelError> {
            self.calls.borrow_mut().push(Call { has_m4: m4.is_some(), num_threads });
            if self.fail {
                return Err(KernelError::DimensionMismatch("stub failure".into()));
            }
            if op.produces_scalar() {
                out.reset(1, 1);
                out.set(0, 0, 42.0);
                Ok(out)
            } else {
                Ok(m1.clone())
            }
        }
    }

    fn parse(text: &str) -> QuaternaryInstruction {
        QuaternaryInstruction::parse_instruction(text).unwrap()
    }

    // --- Decoding ---

    #[test_log::test]
    fn test_fields_round_trip_for_every_opcode() {
        let lines = [
            "wsloss,X,U,V,W,loss,POST,4",
            "wsloss,A,B,C,D,OUT,BASIC,4",
            "wsloss,X,U,V,W,loss,NONE, 2",
            "wdivmm,W,U,V,X,out,MULT_MINUS_RIGHT,2",
            "wsigmoid,W,U,V,out,LOG_MINUS,1",
            "wcemm,X,U,V,ce,BASIC,8",
            "wumm,exp,X,U,V,out,DIV,-1",
        ];
        for line in lines {
            let inst = parse(line);
            let expected: Vec<String> = line.split(',').map(str::to_string).collect();
            assert_eq!(inst.fields(), expected, "round trip of {}", line);
            assert_eq!(inst.to_string(), line);
        }
    }

    #[test_log::test]
    fn test_fields_keep_subtype_alias_and_thread_text() {
        let inst = parse("wsloss,A,B,C,D,OUT,BASIC, 4");
        assert_eq!(inst.operator().op().subtype_name(), "POST");
        assert_eq!(inst.num_threads(), 4);
        assert_eq!(inst.fields()[6..], ["BASIC", " 4"]);
    }

    #[test_log::test]
    fn test_wsloss_decodes_four_inputs() {
        let inst = parse("wsloss,A,B,C,D,OUT,BASIC,4");
        assert_eq!(inst.operator().op(), &QuaternaryOp::WeightedSquaredLoss(WeightsType::Post));
        assert!(inst.operator().requires_four_inputs());
        assert!(inst.operator().produces_scalar());
        assert_eq!(inst.fourth_input().map(|o| o.name()), Some("D"));
        assert_eq!(inst.output().name(), "OUT");
        assert_eq!(inst.num_threads(), 4);
    }

    #[test_log::test]
    fn test_wsloss_with_missing_field_is_malformed() {
        let err = QuaternaryInstruction::parse_instruction("wsloss,A,B,C,OUT,BASIC,4").unwrap_err();
        match err {
            QuaternaryError::MalformedInstruction { instruction, .. } => {
                assert_eq!(instruction, "wsloss,A,B,C,OUT,BASIC,4");
            },
            other => panic!("unexpected error {:?}", other),
        }
        // Extra fields are rejected just the same
        assert!(matches!(
            QuaternaryInstruction::parse_instruction("wcemm,X,U,V,ce,BASIC,8,9"),
            Err(QuaternaryError::MalformedInstruction { .. })
        ));
    }

    #[test_log::test]
    fn test_wsloss_without_weights_keeps_operand_but_does_not_consume_it() {
        let inst = parse("wsloss,X,U,V,W,loss,NONE,1");
        assert_eq!(inst.input4().map(|o| o.name()), Some("W"));
        assert!(inst.fourth_input().is_none());
        let names: Vec<&str> = inst.acquired_inputs().iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["X", "U", "V"]);
    }

    #[test_log::test]
    fn test_three_input_variants_have_no_fourth_operand() {
        for line in ["wsigmoid,A,B,C,OUT,LOG,2", "wcemm,A,B,C,OUT,BASIC,2", "wumm,EXP,A,B,C,OUT,MULT,1"] {
            let inst = parse(line);
            assert!(inst.input4().is_none(), "{}", line);
            assert!(inst.fourth_input().is_none(), "{}", line);
            assert!(!inst.operator().requires_four_inputs(), "{}", line);
        }
    }

    #[test_log::test]
    fn test_wumm_carries_unary_op() {
        let inst = parse("wumm,EXP,A,B,C,OUT,MULT,1");
        assert_eq!(inst.operator().unary_op(), Some("EXP"));
        assert_eq!(inst.operator().family(), OperatorFamily::WeightedUnaryMM);
        let names: Vec<&str> = inst.inputs().iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test_log::test]
    fn test_opcode_is_case_insensitive() {
        let inst = parse("WSigmoid,A,B,C,OUT,BASIC,2");
        assert_eq!(inst.operator().op(), &QuaternaryOp::WeightedSigmoid(WSigmoidType::Basic));
        assert_eq!(inst.opcode(), "WSigmoid");
        assert!(is_quaternary_opcode("WCEMM"));
        assert!(!is_quaternary_opcode("ba+*"));
    }

    #[test_log::test]
    fn test_unknown_opcode_and_subtype() {
        let err = QuaternaryInstruction::parse_instruction("wfoo,A,B,C,OUT,BASIC,2").unwrap_err();
        assert!(matches!(err, QuaternaryError::UnrecognizedInstruction(ref text) if text.contains("wfoo")));

        let err = QuaternaryInstruction::parse_instruction("wsigmoid,A,B,C,OUT,SOFTPLUS,2").unwrap_err();
        assert!(matches!(err, QuaternaryError::UnrecognizedOperator { ref token, .. } if token == "SOFTPLUS"));
    }

    #[test_log::test]
    fn test_bad_thread_count_and_operands_are_malformed() {
        assert!(matches!(
            QuaternaryInstruction::parse_instruction("wcemm,X,U,V,ce,BASIC,many"),
            Err(QuaternaryError::MalformedInstruction { .. })
        ));
        assert!(matches!(
            QuaternaryInstruction::parse_instruction("wcemm,X,,V,ce,BASIC,1"),
            Err(QuaternaryError::MalformedInstruction { .. })
        ));
        assert!(matches!(
            QuaternaryInstruction::parse_instruction("wcemm,X·MATRIX,U,V,ce,BASIC,1"),
            Err(QuaternaryError::MalformedInstruction { .. })
        ));
    }

    #[test_log::test]
    fn test_native_format_with_exec_type_and_value_types() {
        let line = "CP°wdivmm°W·MATRIX·DOUBLE°U·MATRIX·DOUBLE°V·MATRIX·DOUBLE°X·MATRIX·DOUBLE°_mVar3·MATRIX·DOUBLE°DIV_LEFT°16";
        let inst = QuaternaryInstruction::parse_instruction_with(line, &InstructionFormat::native()).unwrap();
        assert_eq!(inst.inputs()[0].name(), "W");
        assert_eq!(inst.inputs()[0].data_type(), DataType::Matrix);
        assert_eq!(inst.output().name(), "_mVar3");
        assert_eq!(inst.num_threads(), 16);
        assert!(!inst.operator().produces_scalar());
        assert_eq!(inst.fields()[0], "wdivmm");
        assert_eq!(inst.instruction_string(), line);
    }

    #[test_log::test]
    fn test_decoding_is_repeatable() {
        let line = "wumm,sqrt,X,U,V,out,DIV,3";
        assert_eq!(parse(line), parse(line));
    }

    // --- Execution ---

    #[test_log::test]
    fn test_wsigmoid_executes_with_three_inputs() {
        let inst = parse("wsigmoid,A,B,C,OUT,LOG,2");
        let mut ec = RecordingContext::with_matrices(&["A", "B", "C"], 2, 2);
        let kernel = StubKernel::default();

        inst.process_instruction(&mut ec, &kernel).unwrap();

        assert_eq!(ec.acquired(), vec!["A", "B", "C"]);
        assert_eq!(ec.released(), vec!["A", "B", "C"]);
        assert_eq!(ec.binds(), vec![&Event::BindMatrix("OUT".into())]);
        let calls = kernel.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].has_m4);
        assert_eq!(calls[0].num_threads, 2);
        for name in ["A", "B", "C"] {
            assert_eq!(ec.inner.pin_count(name), 0);
        }
        assert!(matches!(ec.inner.get("OUT"), Some(Data::Matrix(_))));
    }

    #[test_log::test]
    fn test_wumm_executes_like_wsigmoid() {
        let inst = parse("wumm,EXP,A,B,C,OUT,MULT,1");
        let mut ec = RecordingContext::with_matrices(&["A", "B", "C"], 2, 2);
        let kernel = StubKernel::default();

        inst.process_instruction(&mut ec, &kernel).unwrap();

        assert_eq!(ec.acquired(), vec!["A", "B", "C"]);
        assert_eq!(ec.released(), vec!["A", "B", "C"]);
        assert_eq!(ec.binds(), vec![&Event::BindMatrix("OUT".into())]);
        assert_eq!(kernel.calls.borrow().len(), 1);
    }

    #[test_log::test]
    fn test_four_input_variants_acquire_and_release_four() {
        for line in ["wsloss,X,U,V,W,OUT,PRE,1", "wdivmm,W,U,V,X,OUT,MULT_MINUS_LEFT,1"] {
            let inst = parse(line);
            let mut ec = RecordingContext::with_matrices(&["X", "U", "V", "W"], 2, 2);
            let kernel = StubKernel::default();

            inst.process_instruction(&mut ec, &kernel).unwrap();

            assert_eq!(ec.acquired().len(), 4, "{}", line);
            assert_eq!(ec.acquired(), ec.released(), "{}", line);
            assert!(kernel.calls.borrow()[0].has_m4, "{}", line);
        }
    }

    #[test_log::test]
    fn test_four_slot_variants_without_fourth_input_touch_three() {
        for line in ["wsloss,X,U,V,W,OUT,POST_NZ,1", "wdivmm,W,U,V,X,OUT,DIV_RIGHT,1"] {
            let inst = parse(line);
            // W or X deliberately absent: it must never be looked up
            let mut ec = RecordingContext::with_matrices(&["X", "U", "V", "W"], 2, 2);
            let missing = inst.input4().map(|o| o.name().to_string()).unwrap();
            ec.inner.remove(&missing);
            let kernel = StubKernel::default();

            inst.process_instruction(&mut ec, &kernel).unwrap();

            assert_eq!(ec.acquired().len(), 3, "{}", line);
            assert!(!ec.acquired().contains(&missing.as_str()), "{}", line);
            assert_eq!(ec.acquired(), ec.released(), "{}", line);
            assert!(!kernel.calls.borrow()[0].has_m4, "{}", line);
        }
    }

    #[test_log::test]
    fn test_loss_families_bind_scalars_and_others_bind_matrices() {
        let cases = [
            ("wsloss,X,U,V,W,OUT,POST,1", true),
            ("wsloss,X,U,V,W,OUT,NONE,1", true),
            ("wcemm,X,U,V,OUT,BASIC,1", true),
            ("wdivmm,X,U,V,W,OUT,MULT_BASIC,1", false),
            ("wdivmm,X,U,V,W,OUT,MULT_MINUS_RIGHT,1", false),
            ("wsigmoid,X,U,V,OUT,MINUS,1", false),
            ("wumm,abs,X,U,V,OUT,DIV,1", false),
        ];
        for (line, scalar) in cases {
            let inst = parse(line);
            let mut ec = RecordingContext::with_matrices(&["X", "U", "V", "W"], 3, 3);
            inst.process_instruction(&mut ec, &StubKernel::default()).unwrap();

            let expected = if scalar {
                Event::BindScalar("OUT".into())
            } else {
                Event::BindMatrix("OUT".into())
            };
            assert_eq!(ec.binds(), vec![&expected], "{}", line);
            if scalar {
                assert_eq!(ec.inner.get("OUT"), Some(&Data::Scalar(ScalarObject::Double(42.0))));
            }
        }
    }

    #[test_log::test]
    fn test_scalar_output_follows_output_value_type() {
        let cases = [
            ("wsloss,X,U,V,W,OUT·SCALAR·INT,NONE,1", ScalarObject::Int(42)),
            ("wcemm,X,U,V,OUT·SCALAR·BOOLEAN,BASIC,1", ScalarObject::Boolean(true)),
            ("wcemm,X,U,V,OUT·SCALAR·DOUBLE,BASIC,1", ScalarObject::Double(42.0)),
            ("wsloss,X,U,V,W,OUT·SCALAR·UNKNOWN,NONE,1", ScalarObject::Double(42.0)),
        ];
        for (line, expected) in cases {
            let inst = parse(line);
            let mut ec = RecordingContext::with_matrices(&["X", "U", "V"], 2, 2);
            inst.process_instruction(&mut ec, &StubKernel::default()).unwrap();
            assert_eq!(ec.inner.get("OUT"), Some(&Data::Scalar(expected)), "{}", line);
        }
    }

    #[test_log::test]
    fn test_missing_operand_fails_without_binding() {
        let inst = parse("wsigmoid,A,B,C,OUT,LOG,2");
        let mut ec = RecordingContext::with_matrices(&["A", "C"], 2, 2);
        let kernel = StubKernel::default();

        let err = inst.process_instruction(&mut ec, &kernel).unwrap_err();

        assert!(matches!(err, QuaternaryError::NameNotFound(ref name) if name == "B"));
        assert!(ec.binds().is_empty());
        assert!(ec.released().is_empty());
        assert!(kernel.calls.borrow().is_empty());
        assert!(!ec.inner.contains("OUT"));
    }

    #[test_log::test]
    fn test_kernel_failure_propagates_without_binding() {
        let inst = parse("wcemm,X,U,V,OUT,BASIC,1");
        let mut ec = RecordingContext::with_matrices(&["X", "U", "V"], 2, 2);
        let kernel = StubKernel { fail: true, ..Default::default() };

        let err = inst.process_instruction(&mut ec, &kernel).unwrap_err();

        assert!(matches!(err, QuaternaryError::Kernel(KernelError::DimensionMismatch(_))));
        assert!(ec.binds().is_empty());
        assert!(ec.released().is_empty());
    }

    #[test_log::test]
    fn test_instruction_can_be_executed_repeatedly() {
        let inst = parse("wsigmoid,A,B,C,OUT,BASIC,1");
        let mut ec = RecordingContext::with_matrices(&["A", "B", "C"], 2, 2);
        let kernel = StubKernel::default();

        inst.process_instruction(&mut ec, &kernel).unwrap();
        inst.process_instruction(&mut ec, &kernel).unwrap();

        assert_eq!(kernel.calls.borrow().len(), 2);
        assert_eq!(ec.binds().len(), 2);
        assert_eq!(ec.inner.pin_count("A"), 0);
    }

    #[test_log::test]
    fn test_end_to_end_with_cpu_kernel() {
        let mut vars = LocalVariableMap::new();
        vars.set_matrix_output("X", MatrixBlock::from_rows(&[&[1.0, 0.0], &[2.0, 5.0]]).unwrap()).unwrap();
        vars.set_matrix_output("U", MatrixBlock::from_rows(&[&[1.0], &[1.5]]).unwrap()).unwrap();
        vars.set_matrix_output("V", MatrixBlock::from_rows(&[&[2.0], &[4.0]]).unwrap()).unwrap();
        vars.set_matrix_output("W", MatrixBlock::from_rows(&[&[1.0, 2.0], &[0.0, 1.0]]).unwrap()).unwrap();
        let kernel = CpuKernel::new(RuntimeConfig::default().with_threads(1));

        parse("wsloss,X,U,V,W,loss,POST,1").process_instruction(&mut vars, &kernel).unwrap();
        match vars.get("loss").and_then(Data::as_scalar) {
            Some(ScalarObject::Double(loss)) => assert!((loss - 34.0).abs() < 1e-9),
            other => panic!("loss bound as {:?}", other),
        }

        parse("wdivmm,W,U,V,X,right,MULT_RIGHT,1").process_instruction(&mut vars, &kernel).unwrap();
        let right = vars.get("right").and_then(Data::as_matrix).unwrap();
        assert_eq!((right.rows(), right.cols()), (2, 1));
        assert!((right.get(0, 0) - 36.0).abs() < 1e-9);

        for name in ["X", "U", "V", "W"] {
            assert_eq!(vars.pin_count(name), 0);
        }
    }
}
